/// YAML frontmatter codec for markdown files.
///
/// A document with frontmatter starts with a `---` line, followed by a YAML
/// mapping and a closing `---` line. Everything after the closing line is
/// the body and is returned byte-for-byte.
use serde::de::DeserializeOwned;
use serde::Serialize;

const FENCE: &str = "---";

/// A markdown document split into its raw YAML header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    pub header: Option<&'a str>,
    pub body: &'a str,
}

fn is_fence(line: &str) -> bool {
    line.trim_end_matches(|c| c == '\n' || c == '\r') == FENCE
}

/// Split a document into header and body without interpreting the YAML.
/// An unterminated header means the whole text is body.
pub fn split(source: &str) -> Document<'_> {
    let no_header = Document {
        header: None,
        body: source,
    };

    let first_line_len = match source.find('\n') {
        Some(pos) => pos + 1,
        None => return no_header,
    };
    if !is_fence(&source[..first_line_len]) {
        return no_header;
    }

    let rest = &source[first_line_len..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if is_fence(line) {
            return Document {
                header: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
            };
        }
        offset += line.len();
    }
    no_header
}

/// Parse the header into `T`. Returns `None` for documents without frontmatter.
pub fn parse<T: DeserializeOwned>(source: &str) -> Result<(Option<T>, &str), serde_yaml::Error> {
    let doc = split(source);
    match doc.header {
        Some(header) => Ok((Some(serde_yaml::from_str(header)?), doc.body)),
        None => Ok((None, doc.body)),
    }
}

/// Render a header and body back into a single document.
pub fn render<T: Serialize>(header: &T, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(header)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Header {
        id: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn test_split_without_header() {
        let doc = split("# Just markdown\n\nbody");
        assert_eq!(doc.header, None);
        assert_eq!(doc.body, "# Just markdown\n\nbody");
    }

    #[test]
    fn test_split_header_and_body() {
        let doc = split("---\nid: a\n---\nHello\n");
        assert_eq!(doc.header, Some("id: a\n"));
        assert_eq!(doc.body, "Hello\n");
    }

    #[test]
    fn test_split_crlf_fences() {
        let doc = split("---\r\nid: a\r\n---\r\nbody");
        assert_eq!(doc.header, Some("id: a\r\n"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_unterminated_header_is_body() {
        let text = "---\nid: a\nno closing fence";
        let doc = split(text);
        assert_eq!(doc.header, None);
        assert_eq!(doc.body, text);
    }

    #[test]
    fn test_body_preserved_exactly() {
        let header = Header {
            id: "x1".to_string(),
            tags: vec!["ui".to_string(), "bug".to_string()],
        };
        let body = "\n## Steps\n\n---\n\n* keep  spacing  \n\n";
        let text = render(&header, body).unwrap();
        let (parsed, parsed_body) = parse::<Header>(&text).unwrap();
        assert_eq!(parsed, Some(header));
        assert_eq!(parsed_body, body);
    }

    #[test]
    fn test_empty_body() {
        let header = Header {
            id: "e".to_string(),
            tags: vec![],
        };
        let text = render(&header, "").unwrap();
        assert!(text.ends_with("---\n"));
        let (_, body) = parse::<Header>(&text).unwrap();
        assert_eq!(body, "");
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(parse::<Header>("---\nid: [unclosed\n---\nbody").is_err());
    }
}
