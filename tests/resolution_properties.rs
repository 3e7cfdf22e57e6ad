//! Property tests for conflict parsing, classification and rewriting.

use std::path::Path;

use prgate::conflict::{Classifier, parse_conflicts, resolve_text};
use proptest::prelude::*;

/// A line that can never be mistaken for a conflict marker.
fn plain_line() -> impl Strategy<Value = String> {
    "[a-z_ ]{0,12}( = [0-9]{1,3})?"
}

fn lines(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(plain_line(), 0..max)
}

fn declaration_line() -> impl Strategy<Value = String> {
    ("(var|const) [a-z]{1,6}", 0..100u32).prop_map(|(head, n)| format!("{head} = {n}"))
}

fn conflict(ours: &[String], theirs: &[String]) -> String {
    let mut out = String::from("<<<<<<< HEAD\n");
    for l in ours {
        out.push_str(l);
        out.push('\n');
    }
    out.push_str("=======\n");
    for l in theirs {
        out.push_str(l);
        out.push('\n');
    }
    out.push_str(">>>>>>> main\n");
    out
}

fn join(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

proptest! {
    /// Text without markers is returned byte for byte.
    #[test]
    fn marker_free_text_is_untouched(body in lines(20)) {
        let text = join(&body);
        let res = resolve_text(Path::new("f.gd"), &text, &Classifier::default(), 3).unwrap();
        prop_assert!(!res.has_blocks());
        prop_assert!(res.rewrite.fully_resolved);
        prop_assert_eq!(res.rewrite.text, text);
    }

    /// One block per well-formed region, sides preserved.
    #[test]
    fn every_region_is_parsed(
        before in lines(5),
        ours in lines(5),
        theirs in lines(5),
        after in lines(5),
    ) {
        let text = format!("{}{}{}", join(&before), conflict(&ours, &theirs), join(&after));
        let blocks = parse_conflicts(Path::new("f.gd"), &text, 3);
        prop_assert_eq!(blocks.len(), 1);
        prop_assert_eq!(&blocks[0].ours, &ours);
        prop_assert_eq!(&blocks[0].theirs, &theirs);
    }

    /// Identical sides always collapse to that side with the surroundings kept.
    #[test]
    fn identical_sides_resolve_to_themselves(
        before in lines(5),
        side in lines(5),
        after in lines(5),
    ) {
        let text = format!("{}{}{}", join(&before), conflict(&side, &side), join(&after));
        let res = resolve_text(Path::new("f.gd"), &text, &Classifier::default(), 3).unwrap();
        prop_assert!(res.rewrite.fully_resolved);
        prop_assert_eq!(
            res.rewrite.text,
            format!("{}{}{}", join(&before), join(&side), join(&after))
        );
    }

    /// Declaration merges keep every line from both sides, each once, ours first.
    #[test]
    fn declaration_merge_is_an_ordered_union(
        ours in prop::collection::vec(declaration_line(), 1..6),
        theirs in prop::collection::vec(declaration_line(), 1..6),
    ) {
        prop_assume!(ours != theirs);
        let text = conflict(&ours, &theirs);
        let res = resolve_text(Path::new("f.gd"), &text, &Classifier::default(), 3).unwrap();
        prop_assert!(res.rewrite.fully_resolved);

        let merged: Vec<&str> = res.rewrite.text.lines().collect();
        let mut expected: Vec<&str> = Vec::new();
        for l in ours.iter().chain(&theirs) {
            if !expected.contains(&l.as_str()) {
                expected.push(l);
            }
        }
        prop_assert_eq!(merged, expected);
    }

    /// Unresolved regions survive the rewrite exactly as written.
    #[test]
    fn unresolved_regions_are_preserved(
        ours in prop::collection::vec("\tv_[a-z]{1,6} = [0-9]{1,3}", 1..4),
        theirs in prop::collection::vec("\tv_[a-z]{1,6} = [0-9]{1,3}", 1..4),
    ) {
        prop_assume!(ours != theirs);
        let text = conflict(&ours, &theirs);
        let res = resolve_text(Path::new("f.gd"), &text, &Classifier::default(), 3).unwrap();
        prop_assert!(!res.rewrite.fully_resolved);
        prop_assert_eq!(res.rewrite.text, text);
    }
}
