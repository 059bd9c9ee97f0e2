#[derive(Clone, Copy, Debug)]
pub(crate) struct ToolDescriptor {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
}

pub(crate) const TOOL_CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "list",
        summary: "Directory table: directories first, files with sizes.",
    },
    ToolDescriptor {
        name: "search",
        summary: "Glob search for files under a directory.",
    },
    ToolDescriptor {
        name: "read",
        summary: "Numbered file content, paged by characters when large.",
    },
    ToolDescriptor {
        name: "multi_read",
        summary: "Up to five files in one call.",
    },
    ToolDescriptor {
        name: "write",
        summary: "Create or overwrite a file.",
    },
    ToolDescriptor {
        name: "edit",
        summary: "Exact string replacement in one file.",
    },
    ToolDescriptor {
        name: "multi_edit",
        summary: "Several string replacements, applied in order.",
    },
    ToolDescriptor {
        name: "delete",
        summary: "Delete a file or an empty directory.",
    },
    ToolDescriptor {
        name: "clear",
        summary: "Forget tracked files so instruction files are provided again.",
    },
];

pub(crate) fn tool_instructions() -> String {
    let mut lines = vec![
        "Lineage serves files from one base directory and tracks what you have read.".to_string(),
        "Responses may end with [CHANGED_FILES] (files you read that changed on disk since) and [Appending <path>] blocks (instruction files for the folders you touch). Re-read changed ranges before editing them."
            .to_string(),
        "Pass new_session=true on the first call after a context reset or compaction.".to_string(),
        "Tools:".to_string(),
    ];
    for tool in TOOL_CATALOG {
        lines.push(format!("- {}: {}", tool.name, tool.summary));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_list_every_tool() {
        let text = tool_instructions();
        for tool in TOOL_CATALOG {
            assert!(text.contains(&format!("- {}:", tool.name)), "{}", tool.name);
        }
    }
}
