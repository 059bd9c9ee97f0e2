use super::super::{
    require_directory, CallScope, CallToolResult, LineageService, McpError, SearchRequest,
    ToolResult,
};
use crate::tools::files::glob_search;
use crate::tools::util::{append_section, SECTION_BREAK};

pub(in crate::tools::dispatch) async fn search(
    service: &LineageService,
    request: SearchRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = search_files(service, &mut call, &request);
    drop(call);
    service.finish("search", &request.pattern, outcome)
}

fn search_files(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &SearchRequest,
) -> ToolResult<String> {
    let root = require_directory(service, request.path.as_deref())?;
    let guard = service.guard();
    let matches = glob_search(&root, &request.pattern, guard.base())?;

    let mut out = if matches.is_empty() {
        format!("No files found matching pattern: {}", request.pattern)
    } else {
        let mut lines = vec![
            format!(
                "Found {} file(s) matching '{}':",
                matches.len(),
                request.pattern
            ),
            String::new(),
        ];
        lines.extend(
            matches
                .iter()
                .map(|path| format!("- {}", guard.relative(path).display())),
        );
        lines.join("\n")
    };
    append_section(&mut out, &call.change_section(None), SECTION_BREAK);
    Ok(out)
}
