//! Markdown toolbar actions for the article editor.
//!
//! `apply` wraps or prefixes the selected text and reports where the
//! selection should land afterwards. Selections are byte ranges into the
//! text; out-of-range or mid-character positions are clamped.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownAction {
    Bold,
    Italic,
    Heading,
    UnorderedList,
    OrderedList,
}

impl MarkdownAction {
    fn placeholder(self) -> &'static str {
        match self {
            MarkdownAction::Bold => "bold text",
            MarkdownAction::Italic => "italic text",
            MarkdownAction::Heading => "Heading",
            MarkdownAction::UnorderedList | MarkdownAction::OrderedList => "List item",
        }
    }

    /// Bytes inserted before the selection.
    fn offset(self) -> usize {
        match self {
            MarkdownAction::Italic => 1,
            MarkdownAction::Bold | MarkdownAction::Heading | MarkdownAction::UnorderedList => 2,
            MarkdownAction::OrderedList => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub selection: Range<usize>,
}

/// Apply `action` to `selection` in `text`. With `multiline`, list actions
/// prefix every selected line instead of the selection as a whole.
pub fn apply(text: &str, selection: Range<usize>, action: MarkdownAction, multiline: bool) -> Edit {
    let start = floor_boundary(text, selection.start);
    let end = floor_boundary(text, selection.end.max(start));
    let selected = &text[start..end];
    let body = if selected.is_empty() {
        action.placeholder()
    } else {
        selected
    };

    let per_line = multiline
        && !selected.is_empty()
        && matches!(
            action,
            MarkdownAction::UnorderedList | MarkdownAction::OrderedList
        );

    let replacement = match action {
        MarkdownAction::Bold => format!("**{}**", body),
        MarkdownAction::Italic => format!("*{}*", body),
        MarkdownAction::Heading => format!("# {}", body),
        MarkdownAction::UnorderedList if per_line => selected
            .split('\n')
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        MarkdownAction::UnorderedList => format!("- {}", body),
        MarkdownAction::OrderedList if per_line => selected
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let line = if line.is_empty() { action.placeholder() } else { line };
                format!("{}. {}", i + 1, line)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        MarkdownAction::OrderedList => format!("1. {}", body),
    };

    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(&replacement);
    out.push_str(&text[end..]);

    // Per-line lists gain a prefix on every line; the selection ends where the list does
    let offset = action.offset();
    let selection_end = if per_line {
        start + replacement.len()
    } else {
        end + offset
    };
    Edit {
        text: out,
        selection: (start + offset)..selection_end,
    }
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_wraps_selection() {
        let edit = apply("make this loud", 5..9, MarkdownAction::Bold, false);
        assert_eq!(edit.text, "make **this** loud");
        assert_eq!(&edit.text[edit.selection.clone()], "this");
    }

    #[test]
    fn test_italic_and_heading() {
        let edit = apply("word", 0..4, MarkdownAction::Italic, false);
        assert_eq!(edit.text, "*word*");
        assert_eq!(edit.selection, 1..5);

        let edit = apply("Title", 0..5, MarkdownAction::Heading, false);
        assert_eq!(edit.text, "# Title");
        assert_eq!(edit.selection, 2..7);
    }

    #[test]
    fn test_empty_selection_inserts_placeholder() {
        let edit = apply("ab", 1..1, MarkdownAction::Bold, false);
        assert_eq!(edit.text, "a**bold text**b");
        assert_eq!(edit.selection, 3..3);

        let edit = apply("", 0..0, MarkdownAction::OrderedList, false);
        assert_eq!(edit.text, "1. List item");
    }

    #[test]
    fn test_multiline_lists() {
        let text = "one\ntwo\n\nfour";
        let edit = apply(text, 0..text.len(), MarkdownAction::UnorderedList, true);
        assert_eq!(edit.text, "- one\n- two\n- \n- four");

        let edit = apply(text, 0..text.len(), MarkdownAction::OrderedList, true);
        assert_eq!(edit.text, "1. one\n2. two\n3. List item\n4. four");

        // Without multiline the selection is prefixed once
        let edit = apply("one\ntwo", 0..7, MarkdownAction::UnorderedList, false);
        assert_eq!(edit.text, "- one\ntwo");
    }

    #[test]
    fn test_selection_is_clamped() {
        let edit = apply("héllo", 2..99, MarkdownAction::Italic, false);
        // 2 falls inside 'é' and snaps back to 1
        assert_eq!(edit.text, "h*éllo*");

        let edit = apply("abc", 2..1, MarkdownAction::Bold, false);
        assert_eq!(edit.text, "ab**bold text**c");
    }

    #[test]
    fn test_multiline_selection_spans_every_line() {
        let edit = apply("a\nb", 0..3, MarkdownAction::UnorderedList, true);
        assert_eq!(edit.text, "- a\n- b");
        assert_eq!(&edit.text[edit.selection.clone()], "a\n- b");

        let text = "intro\none\n\nthree\noutro";
        let edit = apply(text, 6..16, MarkdownAction::OrderedList, true);
        assert_eq!(edit.text, "intro\n1. one\n2. List item\n3. three\noutro");
        assert_eq!(
            &edit.text[edit.selection.clone()],
            "one\n2. List item\n3. three"
        );
        assert!(edit.text[edit.selection.end..].starts_with("\noutro"));
    }
}
