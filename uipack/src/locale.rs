//! Localization strings and the component text overlay.
//!
//! An externally supplied strings table can rewrite the text-bearing
//! attributes of a component descriptor. The overlay mutates the tree
//! in place and therefore runs at most once per descriptor instance —
//! the materializer applies it before the descriptor is memoized, so a
//! cache never mixes translated and untranslated content.

use std::collections::HashMap;

use crate::markup::{Element, ElementExt};

/// Two-level translation table: language-group key → element key →
/// translated text.
///
/// Groups are keyed by `<packageId><itemId>`, so one table serves every
/// loaded package.
#[derive(Debug, Default)]
pub struct StringsSource {
    groups: HashMap<String, HashMap<String, String>>,
}

impl StringsSource {
    /// Build the table from its markup form: a sequence of
    /// `<string name="group-key">text</string>` elements. The `name`
    /// splits at its first `-` into group and element key; names
    /// without a `-` are skipped.
    pub fn from_markup(source: &Element) -> Self {
        let mut groups: HashMap<String, HashMap<String, String>> = HashMap::new();

        for node in source.elements_named("string") {
            let Some(name) = node.attr("name") else {
                continue;
            };
            let Some(split) = name.find('-') else {
                continue;
            };
            let group = &name[..split];
            let key = &name[split + 1..];
            let text = node.get_text().map(|t| t.into_owned()).unwrap_or_default();
            groups
                .entry(group.to_string())
                .or_default()
                .insert(key.to_string(), text);
        }

        Self { groups }
    }

    /// Translations for one group, if any.
    pub fn group(&self, key: &str) -> Option<&HashMap<String, String>> {
        self.groups.get(key)
    }
}

/// Rewrite a component descriptor's text attributes in place.
///
/// Walks only the direct children of the `displayList` subtree. Missing
/// keys leave the original attribute untouched; re-running with the
/// same table is a no-op in effect, but callers must still run this at
/// most once per descriptor instance.
pub fn translate_component(descriptor: &mut Element, strings: &HashMap<String, String>) {
    let Some(display_list) = descriptor.child_mut("displayList") else {
        return;
    };

    for node in display_list.children.iter_mut() {
        let Some(child) = node.as_mut_element() else {
            continue;
        };
        let element_id = child.attr("id").unwrap_or_default().to_string();

        if child.attributes.contains_key("tooltips") {
            if let Some(value) = strings.get(&format!("{}-tips", element_id)) {
                set_attr(child, "tooltips", value);
            }
        }

        match child.name.as_str() {
            "text" | "richtext" => {
                if let Some(value) = strings.get(&element_id) {
                    set_attr(child, "text", value);
                }
            }
            "list" => {
                translate_items(child, &element_id, strings);
            }
            "component" => {
                // Fixed preference order: the first matching extension
                // child wins and the rest are not inspected.
                if let Some(button) = child.child_mut("Button") {
                    if let Some(value) = strings.get(&element_id) {
                        set_attr(button, "title", value);
                    }
                    if let Some(value) = strings.get(&format!("{}-0", element_id)) {
                        set_attr(button, "selectedTitle", value);
                    }
                } else if let Some(label) = child.child_mut("Label") {
                    if let Some(value) = strings.get(&element_id) {
                        set_attr(label, "title", value);
                    }
                } else if let Some(combo) = child.child_mut("ComboBox") {
                    if let Some(value) = strings.get(&element_id) {
                        set_attr(combo, "title", value);
                    }
                    translate_items(combo, &element_id, strings);
                }
            }
            _ => {}
        }
    }
}

/// Rewrite each `item` child's `title`, keyed `<elementId>-<index>`
/// (0-based, document order).
fn translate_items(parent: &mut Element, element_id: &str, strings: &HashMap<String, String>) {
    let mut index = 0usize;
    for node in parent.children.iter_mut() {
        let Some(item) = node.as_mut_element() else {
            continue;
        };
        if item.name != "item" {
            continue;
        }
        if let Some(value) = strings.get(&format!("{}-{}", element_id, index)) {
            set_attr(item, "title", value);
        }
        index += 1;
    }
}

fn set_attr(element: &mut Element, name: &str, value: &str) {
    element
        .attributes
        .insert(name.to_string(), value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;

    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn descriptor() -> Element {
        markup::parse(
            "n1.xml",
            r#"<component size="100,30">
                 <displayList>
                   <text id="n1" text="old"/>
                   <richtext id="n2" text="old" tooltips="hint"/>
                   <list id="n3">
                     <item title="a"/>
                     <item title="b"/>
                   </list>
                   <component id="n4">
                     <Button title="old" selectedTitle="old"/>
                   </component>
                   <component id="n5">
                     <Label title="old"/>
                   </component>
                   <component id="n6">
                     <ComboBox title="old">
                       <item title="x"/>
                       <item title="y"/>
                     </ComboBox>
                   </component>
                 </displayList>
               </component>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_strings_source_from_markup() {
        let source = markup::parse(
            "strings.xml",
            r#"<resources>
                 <string name="pkgAitem1-n1">Hello</string>
                 <string name="pkgAitem1-n2-0">World</string>
                 <string name="nodash">skipped</string>
               </resources>"#,
        )
        .unwrap();

        let strings = StringsSource::from_markup(&source);
        let group = strings.group("pkgAitem1").unwrap();
        assert_eq!(group.get("n1").map(String::as_str), Some("Hello"));
        // Only the first '-' splits; the rest stays in the key.
        assert_eq!(group.get("n2-0").map(String::as_str), Some("World"));
        assert!(strings.group("nodash").is_none());
    }

    #[test]
    fn test_text_nodes_translated() {
        let mut desc = descriptor();
        translate_component(&mut desc, &table(&[("n1", "Hello"), ("n2", "Hi")]));
        let list = desc.child("displayList").unwrap();
        assert_eq!(list.elements()[0].attr("text"), Some("Hello"));
        assert_eq!(list.elements()[1].attr("text"), Some("Hi"));
    }

    #[test]
    fn test_tooltips_translated() {
        let mut desc = descriptor();
        translate_component(&mut desc, &table(&[("n2-tips", "New hint")]));
        let list = desc.child("displayList").unwrap();
        assert_eq!(list.elements()[1].attr("tooltips"), Some("New hint"));
        // The text attribute had no matching key and is untouched.
        assert_eq!(list.elements()[1].attr("text"), Some("old"));
    }

    #[test]
    fn test_list_items_translated_by_index() {
        let mut desc = descriptor();
        translate_component(&mut desc, &table(&[("n3-0", "First"), ("n3-1", "Second")]));
        let list = desc.child("displayList").unwrap();
        let items = list.elements()[2].elements_named("item");
        assert_eq!(items[0].attr("title"), Some("First"));
        assert_eq!(items[1].attr("title"), Some("Second"));
    }

    #[test]
    fn test_component_button_title_and_selected() {
        let mut desc = descriptor();
        translate_component(&mut desc, &table(&[("n4", "Ok"), ("n4-0", "Done")]));
        let list = desc.child("displayList").unwrap();
        let button = list.elements()[3].child("Button").unwrap();
        assert_eq!(button.attr("title"), Some("Ok"));
        assert_eq!(button.attr("selectedTitle"), Some("Done"));
    }

    #[test]
    fn test_component_label_and_combobox() {
        let mut desc = descriptor();
        translate_component(
            &mut desc,
            &table(&[("n5", "L"), ("n6", "C"), ("n6-1", "Second")]),
        );
        let list = desc.child("displayList").unwrap();
        assert_eq!(
            list.elements()[4].child("Label").unwrap().attr("title"),
            Some("L")
        );
        let combo = list.elements()[5].child("ComboBox").unwrap();
        assert_eq!(combo.attr("title"), Some("C"));
        let items = combo.elements_named("item");
        assert_eq!(items[0].attr("title"), Some("x"));
        assert_eq!(items[1].attr("title"), Some("Second"));
    }

    #[test]
    fn test_rerun_with_empty_table_changes_nothing() {
        let mut desc = descriptor();
        translate_component(&mut desc, &table(&[("n1", "Hello")]));
        let before = format!("{:?}", desc);
        translate_component(&mut desc, &HashMap::new());
        assert_eq!(format!("{:?}", desc), before);
    }

    #[test]
    fn test_descriptor_without_display_list() {
        let mut desc = markup::parse("n9.xml", "<component/>").unwrap();
        translate_component(&mut desc, &table(&[("n1", "Hello")]));
        // Nothing to rewrite; must not panic.
        assert!(desc.child("displayList").is_none());
    }
}
