//! Line-marker reading of an entry body.
//!
//! Each trimmed, non-blank line is read on its own: `## ` opens a level-2
//! heading, `# ` a level-1 heading, `- ` a bullet item, anything else is a
//! plain paragraph. There is no nesting and no multi-line block.

use super::Block;

pub fn blocks(body: &str) -> Vec<Block> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if let Some(text) = line.strip_prefix("## ") {
                Block::Heading {
                    level: 2,
                    text: text.to_string(),
                }
            } else if let Some(text) = line.strip_prefix("# ") {
                Block::Heading {
                    level: 1,
                    text: text.to_string(),
                }
            } else if let Some(text) = line.strip_prefix("- ") {
                Block::Bullet(text.to_string())
            } else {
                Block::Paragraph(line.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_map_to_blocks() {
        let body = "# Setup\n\n## Reagents\n- Tris 50mM\n  - indented bullet\nPlain line\n### deeper\n";
        assert_eq!(
            blocks(body),
            vec![
                Block::Heading {
                    level: 1,
                    text: "Setup".into()
                },
                Block::Heading {
                    level: 2,
                    text: "Reagents".into()
                },
                Block::Bullet("Tris 50mM".into()),
                Block::Bullet("indented bullet".into()),
                Block::Paragraph("Plain line".into()),
                Block::Paragraph("### deeper".into()),
            ]
        );
    }

    #[test]
    fn test_marker_without_space_is_paragraph() {
        assert_eq!(blocks("#hashtag"), vec![Block::Paragraph("#hashtag".into())]);
    }
}
