//! Message template rendering.

/// Placeholder substituted with the contact's name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Renders a message for one contact by substituting the **first**
/// occurrence of `{name}` with the contact's name.
///
/// Known limitation, kept for compatibility: a template containing the
/// placeholder twice only has the first instance replaced.
pub fn render_message(template: &str, name: &str) -> String {
    template.replacen(NAME_PLACEHOLDER, name, 1)
}
