//! Codecs for the XML documents exchanged with the inventory.
//!
//! - [`layout`]: the layout document (`<layout>` with ordered `<shape>`
//!   children) and the [`RenderFrame`](layout::RenderFrame) that scales it.
//! - [`device`]: the device-structure document describing the containment
//!   hierarchy of a device together with the embedded layouts of its models.

pub mod device;
pub mod layout;

pub use device::{decode_device_structure, encode_device_structure, DeviceRecord, ModelRecord};
pub use layout::{parse_layout, LayoutDocument, ParseError, RenderFrame};

/// Appends `text` to `out`, escaping the characters that are not allowed in a
/// double-quoted attribute value.
pub(crate) fn escape_attr_into(out: &mut String, text: &str) {
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&text[start..i]);
        out.push_str(esc);
        start = i + 1;
    }
    out.push_str(&text[start..]);
}

/// Appends ` name="value"` to `out`.
pub(crate) fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_attr_into(out, value);
    out.push('"');
}
