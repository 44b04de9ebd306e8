use alloc::rc::Rc;
use alloc::string::String;

/// Byte range into a [`Source`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// A named piece of script text.
#[derive(Debug)]
pub struct Source {
    pub name: Rc<str>,
    pub text: Rc<str>,
}

/// Human-oriented position of a span.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Location {
    pub file: Rc<str>,
    /// 1-based.
    pub line: u32,
    /// 0-based, in characters, half-open.
    pub column_start: u32,
    pub column_end: u32,
    /// The whole line the span starts on, without its terminator.
    pub source_line: String,
}

impl Source {
    #[must_use]
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: Rc::from(name),
            text: Rc::from(text),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn location(&self, span: Span) -> Location {
        let text = &*self.text;
        let start = (span.start as usize).min(text.len());
        let end = (span.end as usize).clamp(start, text.len());

        let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[start..].find('\n').map_or(text.len(), |i| start + i);
        let line = text[..start].bytes().filter(|&b| b == b'\n').count() as u32 + 1;

        let column_start = text[line_start..start].chars().count() as u32;
        let column_end = column_start + text[start..end.min(line_end)].chars().count() as u32;

        Location {
            file: Rc::clone(&self.name),
            line,
            column_start,
            column_end,
            source_line: String::from(text[line_start..line_end].trim_end_matches('\r')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_of_second_line() {
        let src = Source::new("t.js", "var a = 1;\nfoo(a);\n");
        let loc = src.location(Span::new(11, 14));
        assert_eq!(loc.line, 2);
        assert_eq!((loc.column_start, loc.column_end), (0, 3));
        assert_eq!(loc.source_line, "foo(a);");
    }

    #[test]
    fn span_crossing_lines_is_clipped() {
        let src = Source::new("t.js", "a(\n1)");
        let loc = src.location(Span::new(0, 5));
        assert_eq!((loc.line, loc.column_start, loc.column_end), (1, 0, 2));
    }
}
