use anyhow::{Context, Result};
use serde_json::json;

mod support;

use support::{err_text, ok_text, start_service};

#[tokio::test]
async fn list_and_search_use_base_relative_paths() -> Result<()> {
    let harness = start_service(&[]).await?;
    let base = &harness.base;
    std::fs::create_dir_all(base.join("src/nested")).context("mkdir")?;
    std::fs::write(base.join("src/main.rs"), "fn main() {}\n").context("write")?;
    std::fs::write(base.join("src/nested/util.rs"), "").context("write")?;
    std::fs::write(base.join("README.md"), "# readme\n").context("write")?;

    let root = ok_text(&harness.client, "list", json!({})).await?;
    assert_eq!(
        root,
        "| Name | Type | Size |\n|------|------|------|\n| src/ | 📁 dir | - |\n| README.md | 📄 file | 9 bytes |"
    );

    let src = ok_text(&harness.client, "list", json!({ "path": "src" })).await?;
    assert!(src.contains("| src/nested/ | 📁 dir | - |"), "{src}");
    assert!(src.contains("| src/main.rs | 📄 file | 13 bytes |"), "{src}");

    let found = ok_text(
        &harness.client,
        "search",
        json!({ "pattern": "**/*.rs" }),
    )
    .await?;
    assert_eq!(
        found,
        "Found 2 file(s) matching '**/*.rs':\n\n- src/main.rs\n- src/nested/util.rs"
    );

    let scoped = ok_text(
        &harness.client,
        "search",
        json!({ "pattern": "*.rs", "path": "src/nested" }),
    )
    .await?;
    assert_eq!(scoped, "Found 1 file(s) matching '*.rs':\n\n- src/nested/util.rs");

    let none = ok_text(&harness.client, "search", json!({ "pattern": "*.py" })).await?;
    assert_eq!(none, "No files found matching pattern: *.py");

    let missing = err_text(&harness.client, "list", json!({ "path": "nowhere" })).await?;
    assert_eq!(missing, "Error: Directory not found: nowhere");

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn write_edit_and_delete_round_out_the_file_lifecycle() -> Result<()> {
    let harness = start_service(&[]).await?;
    let base = &harness.base;

    let wrote = ok_text(
        &harness.client,
        "write",
        json!({ "file_path": "deep/dir/f.txt", "content": "x = 1\ny = 1\n" }),
    )
    .await?;
    assert_eq!(wrote, "Successfully wrote to deep/dir/f.txt");
    assert_eq!(
        std::fs::read_to_string(base.join("deep/dir/f.txt")).context("read back")?,
        "x = 1\ny = 1\n"
    );

    let ambiguous = err_text(
        &harness.client,
        "edit",
        json!({ "file_path": "deep/dir/f.txt", "old_string": "= 1", "new_string": "= 2" }),
    )
    .await?;
    assert_eq!(
        ambiguous,
        "Error: String found 2 times. Use replace_all=true to replace all, or make the string more specific."
    );

    let replaced = ok_text(
        &harness.client,
        "edit",
        json!({
            "file_path": "deep/dir/f.txt",
            "old_string": "= 1",
            "new_string": "= 2",
            "replace_all": true
        }),
    )
    .await?;
    assert_eq!(replaced, "Successfully replaced 2 occurrence(s) in deep/dir/f.txt");

    let not_found = err_text(
        &harness.client,
        "edit",
        json!({ "file_path": "deep/dir/f.txt", "old_string": "zzz", "new_string": "" }),
    )
    .await?;
    assert_eq!(not_found, "Error: String not found in file");

    let dir_not_empty = err_text(
        &harness.client,
        "delete",
        json!({ "file_path": "deep/dir" }),
    )
    .await?;
    assert!(dir_not_empty.starts_with("Error deleting deep/dir:"), "{dir_not_empty}");

    let deleted = ok_text(
        &harness.client,
        "delete",
        json!({ "file_path": "deep/dir/f.txt" }),
    )
    .await?;
    assert_eq!(deleted, "Successfully deleted file: deep/dir/f.txt");
    let deleted_dir = ok_text(
        &harness.client,
        "delete",
        json!({ "file_path": "deep/dir" }),
    )
    .await?;
    assert_eq!(deleted_dir, "Successfully deleted empty directory: deep/dir");
    assert!(!base.join("deep/dir").exists());

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn multi_edit_reports_every_edit_on_its_own() -> Result<()> {
    let harness = start_service(&[]).await?;
    std::fs::write(harness.base.join("a.txt"), "one two\n").context("write")?;
    std::fs::write(harness.base.join("b.txt"), "three\n").context("write")?;

    let text = ok_text(
        &harness.client,
        "multi_edit",
        json!({ "edits": [
            { "file_path": "a.txt", "old_string": "one", "new_string": "1" },
            { "file_path": "b.txt", "old_string": "four", "new_string": "4" },
            { "file_path": "a.txt", "old_string": "two", "new_string": "2" },
            { "old_string": "x", "new_string": "y" }
        ]}),
    )
    .await?;
    assert_eq!(
        text,
        [
            "Edit 1 (a.txt): Successfully replaced 1 occurrence(s)",
            "Edit 2 (b.txt): Error: String not found in file",
            "Edit 3 (a.txt): Successfully replaced 1 occurrence(s)",
            "Edit 4: Error: missing 'file_path'",
        ]
        .join("\n")
    );
    assert_eq!(
        std::fs::read_to_string(harness.base.join("a.txt")).context("read back")?,
        "1 2\n"
    );

    let empty = err_text(&harness.client, "multi_edit", json!({ "edits": [] })).await?;
    assert_eq!(empty, "Error: No edits provided");

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}
