use modeguard::error::FatalError;
use modeguard::lexical::check_formatting;
use proptest::prelude::*;

/// Lines of printable, tab-free text with a leading-space count per line.
fn arb_lines() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0usize..12, "[a-zA-Z0-9:_ -]{0,20}"), 1..20)
}

fn render(lines: &[(usize, String)]) -> String {
    lines
        .iter()
        .map(|(indent, text)| format!("{}{}\n", " ".repeat(*indent), text))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // A tab anywhere is fatal regardless of surrounding content.
    #[test]
    fn any_tab_is_fatal(
        lines in arb_lines(),
        at in any::<prop::sample::Index>(),
        unit in 1usize..5,
    ) {
        let mut raw = render(&lines);
        let pos = at.index(raw.len() + 1);
        // Every byte is ASCII, so any offset is a char boundary.
        raw.insert(pos, '\t');
        prop_assert!(matches!(check_formatting(&raw, unit), Err(FatalError::Tabs)));
    }

    // Passing input has every non-blank line aligned to the unit.
    #[test]
    fn accepted_input_is_aligned(lines in arb_lines(), unit in 1usize..5) {
        let raw = render(&lines);
        let aligned = lines
            .iter()
            .all(|(indent, text)| text.trim().is_empty() || (indent + leading(text)) % unit == 0);
        prop_assert_eq!(check_formatting(&raw, unit).is_ok(), aligned);
    }

    // The reported line is the first misaligned non-blank line.
    #[test]
    fn reported_line_is_first_misaligned(lines in arb_lines(), unit in 2usize..5) {
        let raw = render(&lines);
        let first_bad = lines.iter().position(|(indent, text)| {
            !text.trim().is_empty() && (indent + leading(text)) % unit != 0
        });
        match check_formatting(&raw, unit) {
            Ok(()) => prop_assert!(first_bad.is_none()),
            Err(FatalError::Indentation { line, .. }) => prop_assert_eq!(Some(line - 1), first_bad),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}

fn leading(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b' ').count()
}
