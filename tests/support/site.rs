//! Mock listings website served by wiremock.

use std::io::{Cursor, Write};

use harvester_core::config::{HarvestConfig, PacingSettings, SiteProfile};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

/// Listing page HTML linking to `hrefs`.
pub fn listing_html(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<article class="elementor-post"><h3 class="elementor-post__title"><a href="{href}">Annonce</a></h3></article>"#
            )
        })
        .collect();
    format!("<html><body><main>{items}</main></body></html>")
}

/// Detail page HTML with a title, a date, a content zone and an attachment list.
pub fn detail_html(title: &str, body: &str, attachments: &[(&str, &str)]) -> String {
    let links: String = attachments
        .iter()
        .map(|(href, name)| format!(r#"<li><a href="{href}">{name}</a></li>"#))
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
<nav><a href="/">Accueil</a> <a href="mailto:nav@site.ma">nav@site.ma</a></nav>
<h1 class="entry-title">{title}</h1>
<time>12/02/2026</time>
<div class="entry-content"><p>{body}</p><ul class="post-attachments">{links}</ul></div>
<footer>Pied de page</footer>
</body></html>"#
    )
}

/// In-memory DOCX whose body is one paragraph of `text`.
pub fn docx_bytes(text: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#
    );
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .expect("start docx entry");
        writer.write_all(xml.as_bytes()).expect("write docx entry");
        writer.finish().expect("finish docx");
    }
    buffer.into_inner()
}

/// Serves `body` with status 200 at `route`.
pub async fn serve(server: &MockServer, route: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into()))
        .mount(server)
        .await;
}

/// Serves `status` with an empty body at `route`.
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Configuration pointing at `server`, without politeness delays.
pub fn config_for(server: &MockServer) -> HarvestConfig {
    HarvestConfig {
        site: SiteProfile::default().with_base_url(&server.uri()),
        pacing: PacingSettings::none(),
        ..HarvestConfig::default()
    }
}
