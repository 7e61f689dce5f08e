//! Site document writer.
//!
//! ```text
//! <ldndcsite>
//!   <description> author, email, date, dataset, version, source </description>
//!   <site id=".." lat=".." lon="..">
//!     <general/>
//!     <soil>
//!       <general usehistory=".." soil="NONE" humus="NONE" lheight="0.0" corg5="-99.99" corg30="-99.99"/>
//!       <layers> <layer depth=".." split=".." .../> ... </layers>
//!     </soil>
//!   </site>
//! </ldndcsite>
//! ```
use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::info;

use crate::core::schema::AttributeSchema;
use crate::core::site::{SiteDocument, SiteRecord};
use crate::error::{Error, Result};
use crate::types::NODATA;

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_site<W: Write>(
    writer: &mut Writer<W>,
    site: &SiteRecord,
    use_history: &str,
    schema: &AttributeSchema,
) -> Result<()> {
    let mut start = BytesStart::new("site");
    start.push_attribute(("id", site.id.to_string().as_str()));
    start.push_attribute(("lat", site.lat.to_string().as_str()));
    start.push_attribute(("lon", site.lon.to_string().as_str()));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Empty(BytesStart::new("general")))?;

    writer.write_event(Event::Start(BytesStart::new("soil")))?;
    let nodata = NODATA.to_string();
    let mut general = BytesStart::new("general");
    general.push_attribute(("usehistory", use_history));
    general.push_attribute(("soil", "NONE"));
    general.push_attribute(("humus", "NONE"));
    general.push_attribute(("lheight", "0.0"));
    general.push_attribute(("corg5", nodata.as_str()));
    general.push_attribute(("corg30", nodata.as_str()));
    writer.write_event(Event::Empty(general))?;

    writer.write_event(Event::Start(BytesStart::new("layers")))?;
    for layer in &site.layers {
        let mut elem = BytesStart::new("layer");
        for (name, value) in layer.attributes(schema) {
            elem.push_attribute((name, value.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("layers")))?;
    writer.write_event(Event::End(BytesEnd::new("soil")))?;
    writer.write_event(Event::End(BytesEnd::new("site")))?;
    Ok(())
}

/// Render the document with two-space indentation
pub fn render_site_document(document: &SiteDocument, schema: &AttributeSchema) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("ldndcsite")))?;

    let meta = &document.metadata;
    writer.write_event(Event::Start(BytesStart::new("description")))?;
    text_element(&mut writer, "author", &meta.author)?;
    text_element(&mut writer, "email", &meta.email)?;
    text_element(&mut writer, "date", &meta.date_or_today())?;
    text_element(&mut writer, "dataset", &meta.dataset)?;
    text_element(&mut writer, "version", &meta.version)?;
    text_element(&mut writer, "source", &meta.source)?;
    writer.write_event(Event::End(BytesEnd::new("description")))?;

    for site in &document.sites {
        write_site(&mut writer, site, &document.use_history, schema)?;
    }
    writer.write_event(Event::End(BytesEnd::new("ldndcsite")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| Error::Processing(e.to_string()))
}

/// Store a rendered document
pub fn write_site_file(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document)?;
    info!("Wrote site file {}", path.display());
    Ok(())
}
