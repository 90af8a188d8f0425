//! Path glob patterns.
//!
//! A pattern is matched segment by segment: `*` matches exactly one path
//! segment, `**` matches zero or more segments and may sit mid-pattern,
//! anything else is compared literally. Trailing empty segments are kept,
//! so `/about` and `/about/` stay distinct.

/// A compiled path pattern. Parsing is total; matching is pure.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`: exactly one segment, any content.
    AnyOne,
    /// `**`: zero or more segments.
    Rest,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .into_iter()
            .map(|segment| match segment {
                "*" => Segment::AnyOne,
                "**" => Segment::Rest,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        matches_from(&self.segments, &split(path))
    }
}

/// Split on `/` after stripping a single leading slash. `/a/` keeps its
/// trailing empty segment; `/` and `` have no segments at all.
fn split(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

fn matches_from(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Rest, rest)) => {
            (0..=path.len()).any(|skip| matches_from(rest, &path[skip..]))
        }
        Some((head, rest)) => match path.split_first() {
            None => false,
            Some((segment, tail)) => {
                let hit = match head {
                    Segment::AnyOne => true,
                    Segment::Literal(literal) => literal == segment,
                    Segment::Rest => unreachable!(),
                };
                hit && matches_from(rest, tail)
            }
        },
    }
}
