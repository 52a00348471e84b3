use fancy_regex::Regex;
use modeguard::baseline::SecurityBaseline;
use modeguard::security::{ineffective_constructs, matches_from_start};
use proptest::prelude::*;

fn arb_path() -> impl Strategy<Value = String> {
    "[a-z]{1,6}(/[a-z]{1,6}){0,3}\\.[a-z]{2,3}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // An escaped literal prefix of a path always matches from the start.
    #[test]
    fn literal_prefix_matches(path in arb_path(), cut in any::<prop::sample::Index>()) {
        let end = cut.index(path.len()) + 1;
        let regex = Regex::new(&regex::escape(&path[..end])).unwrap();
        prop_assert!(matches_from_start(&regex, &path));
    }

    // A match that would only start mid-path is not a match.
    #[test]
    fn mid_path_match_is_rejected(path in arb_path()) {
        let prefixed = format!("zz{}", path);
        let regex = Regex::new(&regex::escape(&path)).unwrap();
        prop_assert!(regex.is_match(&prefixed).unwrap());
        prop_assert!(!matches_from_start(&regex, &prefixed));
    }

    // Fully anchored literal patterns never draw a structural warning.
    #[test]
    fn anchored_literals_are_clean(path in arb_path()) {
        let source = format!("^{}$", regex::escape(&path));
        prop_assert!(ineffective_constructs(&source).is_empty());
    }

    // Builtin categories classify paths under their own directory.
    #[test]
    fn category_directories_are_classified(file in "[0-9]{1,8}\\.ts") {
        let baseline = SecurityBaseline::builtin().unwrap();
        for (dir, category) in [("auth", "auth_files"), ("admin", "admin_files"), ("billing", "payment_files")] {
            let path = format!("src/{}/{}", dir, file);
            prop_assert_eq!(baseline.classify(&path).map(|c| c.name.as_str()), Some(category));
        }
    }
}
