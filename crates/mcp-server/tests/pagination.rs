use anyhow::{Context, Result};
use serde_json::json;

mod support;

use support::{ok_text, start_service};

fn extract_next_cursor(text: &str) -> Option<usize> {
    let tail = text.rsplit("cursor=").next()?;
    tail.strip_suffix(')')?.parse().ok()
}

/// Page body without header, sections and footer (line numbers off).
fn page_body(text: &str) -> &str {
    let start = text.find('\n').map_or(0, |idx| idx + 1);
    let end = text[start..]
        .find("\n\n---\n")
        .map_or(text.len(), |idx| start + idx);
    &text[start..end]
}

/// Follow continuation footers from `first` and collect every page.
async fn read_to_end(
    client: &support::Client,
    file_path: &str,
    char_limit: usize,
    first: String,
) -> Result<Vec<String>> {
    let mut text = first;
    let mut pages = Vec::new();
    for _ in 0..50usize {
        assert!(text.starts_with("[chars "), "{text}");
        assert!(
            text.chars().count() <= char_limit,
            "{} chars over the {char_limit} limit: {text}",
            text.chars().count()
        );
        pages.push(page_body(&text).to_string());
        let Some(cursor) = extract_next_cursor(&text) else {
            assert!(text.ends_with("\n\n---\nEnd of file reached."), "{text}");
            return Ok(pages);
        };
        text = ok_text(
            client,
            "read",
            json!({ "file_path": file_path, "cursor": cursor }),
        )
        .await?;
    }
    anyhow::bail!("no end of file after 50 pages")
}

#[tokio::test]
async fn large_files_are_paged_and_pages_reassemble_the_file() -> Result<()> {
    let harness = start_service(&[("LINEAGE_READ_CHAR_LIMIT", "400")]).await?;
    let content: String = (1..=40).map(|n| format!("line number {n:02}\n")).collect();
    std::fs::write(harness.base.join("big.txt"), &content).context("write big.txt")?;

    let first = ok_text(&harness.client, "read", json!({ "file_path": "big.txt" })).await?;
    let pages = read_to_end(&harness.client, "big.txt", 400, first).await?;

    assert!(pages.len() > 1, "expected several pages");
    assert_eq!(pages.concat(), content);

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn appended_sections_count_against_the_read_limit() -> Result<()> {
    let harness = start_service(&[("LINEAGE_READ_CHAR_LIMIT", "600")]).await?;
    let base = &harness.base;
    std::fs::create_dir_all(base.join("pkg")).context("mkdir")?;
    std::fs::write(base.join("pkg/AGENTS.md"), "pkg rules ".repeat(15)).context("write")?;
    // Fits the limit on its own; the instruction file pushes the response over it.
    let content: String = (1..=35).map(|n| format!("entry nr {n:04}\n")).collect();
    assert!(content.chars().count() < 600);
    std::fs::write(base.join("pkg/data.txt"), &content).context("write data")?;

    let first = ok_text(
        &harness.client,
        "read",
        json!({ "file_path": "pkg/data.txt" }),
    )
    .await?;
    assert!(first.starts_with("[chars 0-"), "{first}");
    assert!(first.contains("pkg rules"), "{first}");
    assert!(first.contains("cursor="), "{first}");

    let pages = read_to_end(&harness.client, "pkg/data.txt", 600, first).await?;
    assert_eq!(pages.concat(), content);

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn the_same_page_is_returned_for_unchanged_content() -> Result<()> {
    let harness = start_service(&[("LINEAGE_READ_CHAR_LIMIT", "100")]).await?;
    let content: String = (1..=30).map(|n| format!("row {n}\n")).collect();
    std::fs::write(harness.base.join("rows.txt"), &content).context("write rows.txt")?;

    let args = json!({ "file_path": "rows.txt", "page": 1 });
    let first = ok_text(&harness.client, "read", args.clone()).await?;
    let second = ok_text(&harness.client, "read", args).await?;
    assert_eq!(first, second);
    assert!(
        first.starts_with("[chars 96-194 of 201 (48% of file), page 2 of 3] File: rows.txt\n"),
        "{first}"
    );
    assert_eq!(extract_next_cursor(&first), Some(194));

    let past_end = ok_text(
        &harness.client,
        "read",
        json!({ "file_path": "rows.txt", "page": 99 }),
    )
    .await?;
    assert_eq!(past_end, "File: rows.txt\n\nEnd of file reached.");

    harness.client.cancel().await.context("shutdown mcp service")?;
    Ok(())
}
