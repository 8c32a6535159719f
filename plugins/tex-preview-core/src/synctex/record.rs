//! Line tokenizer for the positional trace format.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

/// Raw `(tag,line:left,bottom:width,height,depth` fields, in native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoxFields {
    pub tag: u32,
    pub line: u32,
    pub left: i64,
    pub bottom: i64,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceRecord<'a> {
    Input {
        tag: u32,
        path: &'a str,
    },
    Offset {
        axis: Axis,
        value: i64,
    },
    PageOpen(usize),
    PageClose,
    HorizontalBox(BoxFields),
    VerticalBox(BoxFields),
    Element {
        kind: char,
        tag: u32,
        line: u32,
        left: i64,
        bottom: i64,
        extra: Option<i64>,
    },
}

struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    const fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn digits(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (digits, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(digits)
    }

    fn unsigned<T: std::str::FromStr>(&mut self) -> Option<T> {
        self.digits()?.parse().ok()
    }

    fn signed(&mut self) -> Option<i64> {
        let negative = match self.rest.strip_prefix('-') {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        };
        let magnitude: i64 = self.unsigned()?;
        Some(if negative { -magnitude } else { magnitude })
    }

    fn separator(&mut self, sep: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(sep)?;
        Some(())
    }

    const fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

fn box_fields(body: &str) -> Option<BoxFields> {
    let mut fields = Fields::new(body);
    let tag = fields.unsigned()?;
    fields.separator(',')?;
    let line = fields.unsigned()?;
    fields.separator(':')?;
    let left = fields.signed()?;
    fields.separator(',')?;
    let bottom = fields.signed()?;
    fields.separator(':')?;
    let width = fields.signed()?;
    fields.separator(',')?;
    let height = fields.signed()?;
    fields.separator(',')?;
    let depth = fields.signed()?;
    Some(BoxFields {
        tag,
        line,
        left,
        bottom,
        width,
        height,
        depth,
    })
}

fn element(kind: char, body: &str) -> Option<TraceRecord<'_>> {
    let mut fields = Fields::new(body);
    let tag = fields.unsigned()?;
    fields.separator(',')?;
    let line = fields.unsigned()?;
    fields.separator(':')?;
    let left = fields.signed()?;
    fields.separator(',')?;
    let bottom = fields.signed()?;
    let extra = fields.separator(':').and_then(|()| fields.signed());
    Some(TraceRecord::Element {
        kind,
        tag,
        line,
        left,
        bottom,
        extra,
    })
}

fn page_marker(body: &str) -> Option<usize> {
    let mut fields = Fields::new(body);
    let page = fields.unsigned()?;
    fields.is_empty().then_some(page)
}

/// Classify one trace line. Lines that match no record kind yield `None`.
pub(crate) fn parse_record(line: &str) -> Option<TraceRecord<'_>> {
    if let Some(rest) = line.strip_prefix("Input:") {
        let (tag, path) = rest.split_once(':')?;
        if path.is_empty() {
            return None;
        }
        return Some(TraceRecord::Input {
            tag: Fields::new(tag).unsigned()?,
            path,
        });
    }
    for (prefix, axis) in [("X Offset:", Axis::X), ("Y Offset:", Axis::Y)] {
        if let Some(rest) = line.strip_prefix(prefix) {
            let value = Fields::new(rest).unsigned()?;
            return Some(TraceRecord::Offset { axis, value });
        }
    }

    let mut chars = line.chars();
    let kind = chars.next()?;
    let body = chars.as_str();
    match kind {
        '{' => page_marker(body).map(TraceRecord::PageOpen),
        '}' => page_marker(body).map(|_| TraceRecord::PageClose),
        '(' => box_fields(body).map(TraceRecord::HorizontalBox),
        '[' => box_fields(body).map(TraceRecord::VerticalBox),
        _ => element(kind, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn parses_horizontal_box_with_signed_fields() {
        assert_eq!(
            parse_record("(1,42:-100,200:50,20,-3"),
            Some(TraceRecord::HorizontalBox(BoxFields {
                tag: 1,
                line: 42,
                left: -100,
                bottom: 200,
                width: 50,
                height: 20,
                depth: -3,
            }))
        );
    }

    #[test]
    fn parses_input_with_colons_in_path() {
        assert_eq!(
            parse_record("Input:3:C:/work/doc.tex"),
            Some(TraceRecord::Input {
                tag: 3,
                path: "C:/work/doc.tex",
            })
        );
    }

    #[rstest]
    #[case("g1,7:100,200", Some(None))]
    #[case("k1,7:100,200:-40", Some(Some(-40)))]
    #[case("g1,7:100", None)]
    fn parses_elements_with_optional_extra(
        #[case] line: &str,
        #[case] expected_extra: Option<Option<i64>>,
    ) {
        let extra = parse_record(line).and_then(|record| match record {
            TraceRecord::Element { extra, .. } => Some(extra),
            _ => None,
        });
        assert_eq!(extra, expected_extra);
    }

    #[rstest]
    #[case("{3", Some(TraceRecord::PageOpen(3)))]
    #[case("}3", Some(TraceRecord::PageClose))]
    #[case("{3x", None)]
    #[case("X Offset:720000", Some(TraceRecord::Offset { axis: Axis::X, value: 720000 }))]
    #[case("Y Offset:-5", None)]
    #[case("", None)]
    #[case("Content:", None)]
    fn classifies_markers(#[case] line: &str, #[case] expected: Option<TraceRecord<'static>>) {
        assert_eq!(parse_record(line), expected);
    }

    #[test]
    fn vertical_boxes_are_recognised() {
        assert!(matches!(
            parse_record("[1,3:0,0:10,10,0"),
            Some(TraceRecord::VerticalBox(_))
        ));
    }
}
