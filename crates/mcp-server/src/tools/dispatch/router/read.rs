use super::super::{
    CallScope, CallToolResult, LineageService, McpError, ReadRequest, ToolError, ToolResult,
};
use crate::tools::util::{append_section, number_lines, RULED_BREAK};
use lineage_session::{paginate, PageResult};

pub(in crate::tools::dispatch) async fn read(
    service: &LineageService,
    request: ReadRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = read_file(service, &mut call, &request);
    drop(call);
    service.finish("read", &request.file_path, outcome)
}

/// How a paged read picks its slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paging {
    /// Fixed window `k` of the read limit.
    Page(usize),
    /// Continue from a character offset, sized so the whole response fits the limit.
    Cursor(usize),
}

fn read_file(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &ReadRequest,
) -> ToolResult<String> {
    let window_requested = request.offset.is_some() || request.limit.is_some();
    if request.page.is_some() && request.cursor.is_some() {
        return Err(ToolError::InvalidRequest(
            "Cannot use 'page' together with 'cursor'.".to_string(),
        ));
    }
    if (request.page.is_some() || request.cursor.is_some()) && window_requested {
        return Err(ToolError::InvalidRequest(
            "Cannot use 'page' or 'cursor' with 'offset' or 'limit'. Choose one pagination method."
                .to_string(),
        ));
    }

    let (path, file) = service.read_tracked(call, &request.file_path)?;

    // Sections are computed once, after this file's own fingerprint is fresh.
    let mut overhead = String::new();
    append_section(
        &mut overhead,
        &call.change_section(Some(&path)),
        RULED_BREAK,
    );
    append_section(
        &mut overhead,
        &call.instruction_section(&path, service.guard().base()),
        RULED_BREAK,
    );

    let numbered = request.show_line_numbers;
    let char_limit = service.session().config().read_char_limit;
    let paging = match (request.page, request.cursor) {
        (Some(page), _) => Some(Paging::Page(page)),
        (None, Some(cursor)) => Some(Paging::Cursor(cursor)),
        (None, None) if !window_requested => {
            let shown = if numbered {
                number_lines(&file.content, 1).chars().count()
            } else {
                file.content.chars().count()
            };
            (shown + overhead.chars().count() > char_limit).then_some(Paging::Cursor(0))
        }
        (None, None) => None,
    };

    Ok(match paging {
        Some(paging) => render_paged(
            &request.file_path,
            &file.content,
            paging,
            char_limit,
            numbered,
            &overhead,
        ),
        None => {
            let mut out = render_window(&file.content, request.offset, request.limit, numbered);
            out.push_str(&overhead);
            out
        }
    })
}

fn render_window(
    content: &str,
    offset: Option<usize>,
    limit: Option<usize>,
    numbered: bool,
) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let start = offset.unwrap_or(0);
    if start >= lines.len() {
        return String::new();
    }
    let end = limit.map_or(lines.len(), |limit| {
        start.saturating_add(limit).min(lines.len())
    });
    let window = lines[start..end].concat();
    if numbered {
        number_lines(&window, start + 1)
    } else {
        window
    }
}

/// Page body of `content` starting at character `cursor`, with `budget` covering the
/// `N→` prefixes when lines are numbered.
fn slice_from(content: &str, cursor: usize, budget: usize, numbered: bool) -> PageResult {
    let tail: String = content.chars().skip(cursor).collect();
    let page = paginate(&tail, 0, budget);
    if !numbered {
        return page;
    }
    let first_line = line_at(content, cursor) + 1;
    let lines = page.end_line - page.start_line;
    let prefix = lines * (digits(first_line + lines) + 1);
    if page.chars_returned + prefix <= budget {
        return page;
    }
    // A smaller budget never yields more lines, so the prefixes still fit.
    paginate(&tail, 0, budget.saturating_sub(prefix).max(1))
}

/// 0-indexed line holding character `offset`.
fn line_at(content: &str, offset: usize) -> usize {
    content.chars().take(offset).filter(|&ch| ch == '\n').count()
}

fn digits(value: usize) -> usize {
    value.to_string().len()
}

fn header(
    file_path: &str,
    start: usize,
    end: usize,
    total_chars: usize,
    page_of: Option<(usize, usize)>,
) -> String {
    let percent = (end - start) * 100 / total_chars.max(1);
    match page_of {
        Some((page, total_pages)) => format!(
            "[chars {start}-{end} of {total_chars} ({percent}% of file), page {page} of {total_pages}] File: {file_path}\n"
        ),
        None => format!(
            "[chars {start}-{end} of {total_chars} ({percent}% of file)] File: {file_path}\n"
        ),
    }
}

fn continuation(file_path: &str, partial_line: Option<usize>, next_cursor: usize) -> String {
    let mut out = String::from(RULED_BREAK);
    if let Some(line) = partial_line {
        out.push_str(&format!("Line {line} continues on the next page.\n"));
    }
    out.push_str(&format!(
        "To continue reading, use: read(file_path=\"{file_path}\", cursor={next_cursor})"
    ));
    out
}

/// Upper bound on header plus footer for a file of `total_chars` characters.
fn frame_len(file_path: &str, total_chars: usize) -> usize {
    let widest = total_chars.max(100);
    let head = header(file_path, 0, widest, widest, Some((widest, widest)));
    let foot = continuation(file_path, Some(widest), widest);
    head.chars().count() + foot.chars().count()
}

/// Header, page body, trailing sections, then the footer as the very last thing.
fn render_paged(
    file_path: &str,
    content: &str,
    paging: Paging,
    char_limit: usize,
    numbered: bool,
    overhead: &str,
) -> String {
    let total_chars = content.chars().count();
    let (page, start, page_of) = match paging {
        Paging::Page(index) => {
            let page = paginate(content, index, char_limit);
            let start = page.start_char;
            let page_of = (index + 1, page.total_pages);
            (page, start, Some(page_of))
        }
        Paging::Cursor(cursor) => {
            let reserved = overhead.chars().count() + frame_len(file_path, total_chars);
            let budget = char_limit.saturating_sub(reserved).max(1);
            (slice_from(content, cursor, budget, numbered), cursor, None)
        }
    };
    if page.chars_returned == 0 {
        return format!("File: {file_path}\n\nEnd of file reached.{overhead}");
    }

    let end = start + page.chars_returned;
    let mut out = header(file_path, start, end, total_chars, page_of);
    if numbered {
        let first_line = line_at(content, start) + 1;
        out.push_str(&number_lines(&page.text, first_line));
    } else {
        out.push_str(&page.text);
    }
    out.push_str(overhead);

    if end >= total_chars {
        out.push_str(RULED_BREAK);
        out.push_str("End of file reached.");
    } else {
        let partial = page
            .is_partial_line
            .then(|| line_at(content, end) + 1);
        out.push_str(&continuation(file_path, partial, end));
    }
    out
}
