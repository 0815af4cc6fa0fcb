//! Property-based tests for template registration and rendering.

use proptest::prelude::*;
use serde_json::json;
use templatebox::{Archive, FileSet, LiteralSet, Registry};

fn empty_registry() -> Registry {
    Registry::from_archive(Some(Archive::new()), "", None).unwrap()
}

// Text that contains no template delimiters.
fn static_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,;:!?()\\[\\]<>/=\"'&\n-]{0,200}"
}

proptest! {
    /// A literal without tags renders to exactly its own text.
    #[test]
    fn static_literal_renders_unchanged(text in static_text()) {
        let registry = empty_registry();
        registry.add_literal_set("t", LiteralSet::new([text.clone()])).unwrap();

        prop_assert_eq!(registry.render_to_string("t", ()).unwrap(), text);
    }

    /// A file without tags renders to exactly its own bytes.
    #[test]
    fn static_file_renders_unchanged(text in static_text()) {
        let archive = Archive::new().with_entry("views/page.html", text.clone());
        let registry = Registry::from_archive(Some(archive), "views", None).unwrap();
        registry.add_file_set("page", FileSet::new(["page.html"])).unwrap();

        prop_assert_eq!(registry.render_to_string("page", ()).unwrap(), text);
    }

    /// Interpolated values never produce raw markup characters.
    #[test]
    fn interpolated_values_are_escaped(value in any::<String>()) {
        let registry = empty_registry();
        registry
            .add_literal_set(
                "t",
                LiteralSet::new([
                    "<p>{% block body %}{% endblock %}</p>",
                    "{% block body %}{{ value }}{% endblock %}",
                ]),
            )
            .unwrap();

        let html = registry.render_to_string("t", json!({ "value": value })).unwrap();
        let inner = &html["<p>".len()..html.len() - "</p>".len()];
        prop_assert!(!inner.contains('<'));
        prop_assert!(!inner.contains('>'));
        prop_assert!(!inner.contains('"'));
    }

    /// The last registration under a name is the one that renders.
    #[test]
    fn last_registration_wins(texts in prop::collection::vec("[a-z]{1,12}", 1..10)) {
        let registry = empty_registry();
        for text in &texts {
            registry.add_literal_set("t", LiteralSet::new([text.clone()])).unwrap();
        }

        prop_assert_eq!(registry.len(), 1);
        prop_assert_eq!(&registry.render_to_string("t", ()).unwrap(), texts.last().unwrap());
    }
}
