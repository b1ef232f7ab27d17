//! Hand-assembled PDFs for tests. Every page uses Helvetica as `/F1`.

/// Each inner slice is one page; each string on a page becomes its own text
/// object.
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let contents = pages
        .iter()
        .map(|fragments| page_content(fragments))
        .collect::<Vec<_>>();
    pdf_with_contents(&contents)
}

/// One page per entry, each holding the given raw content stream.
pub fn pdf_with_contents<S: AsRef<str>>(contents: &[S]) -> Vec<u8> {
    let page_count = contents.len();
    // 1 catalog, 2 page tree, 3 font, then a (page, content) pair per page.
    let page_id = |index: usize| 4 + index * 2;
    let content_id = |index: usize| 5 + index * 2;
    let object_count = 3 + page_count * 2;

    let mut out = Vec::new();
    let mut offsets = Vec::with_capacity(object_count);
    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    let kids = (0..page_count)
        .map(|index| format!("{} 0 R", page_id(index)))
        .collect::<Vec<_>>()
        .join(" ");
    offsets.push(out.len());
    out.extend_from_slice(
        format!("2 0 obj << /Type /Pages /Kids [{kids}] /Count {page_count} >> endobj\n")
            .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n");

    for (index, content) in contents.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                page_id(index),
                content_id(index)
            )
            .as_bytes(),
        );

        let content = content.as_ref();
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_id(index),
                content.len(),
                content
            )
            .as_bytes(),
        );
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
            object_count + 1
        )
        .as_bytes(),
    );
    out
}

fn page_content(fragments: &[&str]) -> String {
    if fragments.is_empty() {
        return "BT ET".to_string();
    }

    fragments
        .iter()
        .enumerate()
        .map(|(line, fragment)| {
            format!(
                "BT /F1 12 Tf 72 {} Td ({}) Tj ET",
                720 - line * 16,
                escape_literal(fragment)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}
