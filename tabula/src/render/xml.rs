use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::TabulaError;
use crate::table::{Column, Row};
use crate::value::Value;

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// `<resultset statement="...">` envelope with one `<row>` per row and
/// one named `<field>` per column. The original SQL text rides along in
/// the statement attribute for audit output.
pub(crate) fn write_resultset(
    output: &mut dyn Write,
    columns: &[Column],
    rows: &[Row],
    statement: &str,
) -> Result<(), TabulaError> {
    let mut writer = Writer::new_with_indent(output, b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new(
        "1.0",
        Some("UTF-8"),
        None,
    )))?;

    let mut root = BytesStart::new("resultset");
    root.push_attribute(("statement", statement));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    for row in rows {
        writer.write_event(Event::Start(BytesStart::new("row")))?;
        for col in columns {
            let mut field = BytesStart::new("field");
            field.push_attribute(("name", col.name.as_str()));
            writer.write_event(Event::Start(field))?;

            let value = row.get(&col.name).unwrap_or(&Value::Null);
            let text = value.render_text(col);
            if !text.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }

            writer.write_event(Event::End(BytesEnd::new("field")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("resultset")))?;
    Ok(())
}
