use super::super::{
    CallScope, CallToolResult, LineageService, McpError, MultiReadRequest, ToolError, ToolResult,
};
use crate::tools::util::{append_section, number_lines, SECTION_BREAK};

const MAX_FILES: usize = 5;

pub(in crate::tools::dispatch) async fn multi_read(
    service: &LineageService,
    request: MultiReadRequest,
) -> Result<CallToolResult, McpError> {
    let mut call = match service.begin_call(request.new_session).await {
        Ok(call) => call,
        Err(refusal) => return Ok(refusal),
    };
    let outcome = read_files(service, &mut call, &request);
    drop(call);
    service.finish("multi_read", &request.file_paths.join(","), outcome)
}

fn read_files(
    service: &LineageService,
    call: &mut CallScope<'_>,
    request: &MultiReadRequest,
) -> ToolResult<String> {
    if request.file_paths.is_empty() {
        return Err(ToolError::InvalidRequest(
            "No file paths provided".to_string(),
        ));
    }
    if request.file_paths.len() > MAX_FILES {
        return Err(ToolError::InvalidRequest(format!(
            "Too many files requested ({}). Maximum is {MAX_FILES}.",
            request.file_paths.len()
        )));
    }

    let numbered = request.show_line_numbers;
    let mut sections = Vec::with_capacity(request.file_paths.len());
    let mut instructions = Vec::new();

    for requested in &request.file_paths {
        let header = format!("--- {requested} ---");
        match service.read_tracked(call, requested) {
            Ok((path, file)) => {
                let body = if numbered {
                    number_lines(&file.content, 1)
                } else {
                    file.content
                };
                sections.push(format!("{header}\n{body}"));
                // Folders provided for an earlier file in this call are already marked.
                let found = call.instruction_section(&path, service.guard().base());
                if !found.is_empty() {
                    instructions.push(found);
                }
            }
            Err(err) => sections.push(format!("{header}\n{err}")),
        }
    }

    let mut out = sections.join("\n\n");
    append_section(&mut out, &call.change_section(None), SECTION_BREAK);
    append_section(&mut out, &instructions.join("\n\n"), SECTION_BREAK);
    Ok(out)
}
