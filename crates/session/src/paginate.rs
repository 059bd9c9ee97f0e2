//! Line-aligned character pagination.
//!
//! Page `k` covers the character window `[k * limit, (k + 1) * limit)`. It starts where page
//! `k - 1` stopped and ends at the last line boundary inside its window, so lines are never split
//! unless a single line is longer than `limit`. The last page always runs to the end of the
//! content.

/// One page of a paginated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub text: String,
    pub chars_returned: usize,
    /// 0-indexed line of the first character on this page.
    pub start_line: usize,
    /// 0-indexed, exclusive. A line cut mid-way counts as touched.
    pub end_line: usize,
    pub total_pages: usize,
    pub is_last_page: bool,
    /// The page stops inside a line that continues on the next page.
    pub is_partial_line: bool,
    pub start_char: usize,
    pub end_char: usize,
    pub total_chars: usize,
    pub total_lines: usize,
}

struct LineIndex {
    /// Cumulative code-point offset at the end of every line (terminator included).
    ends: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut ends = Vec::new();
        let mut cumulative = 0usize;
        for line in content.split_inclusive('\n') {
            cumulative += line.chars().count();
            ends.push(cumulative);
        }
        Self { ends }
    }

    fn total_chars(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    fn total_lines(&self) -> usize {
        self.ends.len()
    }

    /// Largest line end in `(start, limit]`.
    fn last_boundary_within(&self, start: usize, limit: usize) -> Option<usize> {
        let idx = self.ends.partition_point(|&end| end <= limit);
        idx.checked_sub(1)
            .map(|i| self.ends[i])
            .filter(|&end| end > start)
    }

    /// Index of the line containing character `offset`.
    fn line_of(&self, offset: usize) -> usize {
        self.ends.partition_point(|&end| end <= offset)
    }

    /// Number of lines that start before `offset`.
    fn lines_started_before(&self, offset: usize) -> usize {
        if offset == 0 {
            return 0;
        }
        self.ends.partition_point(|&end| end < offset) + 1
    }

    fn is_boundary(&self, offset: usize) -> bool {
        offset == 0 || self.ends.binary_search(&offset).is_ok()
    }
}

pub fn total_pages(content: &str, char_limit: usize) -> usize {
    let limit = char_limit.max(1);
    content.chars().count().div_ceil(limit).max(1)
}

/// Slice `content` into page `page_index` of at most roughly `char_limit` code points.
///
/// Pure: the same inputs always produce the same page.
pub fn paginate(content: &str, page_index: usize, char_limit: usize) -> PageResult {
    let limit = char_limit.max(1);
    let index = LineIndex::new(content);
    let total_chars = index.total_chars();
    let total_lines = index.total_lines();
    let total_pages = total_chars.div_ceil(limit).max(1);

    if page_index >= total_pages || total_chars == 0 {
        return PageResult {
            text: String::new(),
            chars_returned: 0,
            start_line: total_lines,
            end_line: total_lines,
            total_pages,
            is_last_page: true,
            is_partial_line: false,
            start_char: total_chars,
            end_char: total_chars,
            total_chars,
            total_lines,
        };
    }

    let mut start = 0usize;
    let mut end = 0usize;
    for page in 0..=page_index {
        start = end;
        end = if page + 1 == total_pages {
            total_chars
        } else {
            let window_end = (page + 1) * limit;
            index
                .last_boundary_within(start, window_end)
                .unwrap_or(window_end)
        };
    }

    let text = slice_chars(content, start, end);
    PageResult {
        chars_returned: end - start,
        text,
        start_line: index.line_of(start),
        end_line: index.lines_started_before(end),
        total_pages,
        is_last_page: page_index + 1 == total_pages,
        is_partial_line: !index.is_boundary(end) && end < total_chars,
        start_char: start,
        end_char: end,
        total_chars,
        total_lines,
    }
}

fn slice_chars(content: &str, start: usize, end: usize) -> String {
    content.chars().skip(start).take(end - start).collect()
}
