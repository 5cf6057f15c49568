//! End-to-end runs of the harvesting pipeline against a mocked website.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use harvester_core::{
    AnalysisModel, AnalysisSource, Harvester, HarvestStatistics, ModelError, NoProgress,
    RunRequest, recognize_emails,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::site::{config_for, detail_html, docx_bytes, listing_html, serve, serve_status};

/// Answers for postings whose prompt names "Alpha" and fails for the others.
struct ScriptedModel {
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("Alpha") {
            Ok(r#"```json
{"organisation": "Association Alpha", "emails": ["MODEL@alpha.ma"], "secteur": "Health",
 "type_opportunite": "Consultancy", "localisation": "Rabat", "resume": "Mission courte.",
 "mots_cles": ["sante", "evaluation"]}
```"#
                .to_string())
        } else {
            Err(ModelError::EmptyResponse)
        }
    }
}

/// Two listing pages, three postings (one broken), one event entry.
async fn mock_site() -> MockServer {
    let server = MockServer::start().await;

    serve(
        &server,
        "/appels-doffres/",
        listing_html(&[
            "/p/alpha/",
            "/p/beta/",
            "/evenement/forum/",
            "/p/alpha/?utm_source=newsletter#top",
        ]),
    )
    .await;
    serve(
        &server,
        "/appels-doffres/2/",
        listing_html(&["/p/gamma/", "/p/alpha/"]),
    )
    .await;

    serve(
        &server,
        "/p/alpha/",
        detail_html(
            "Consultant Alpha",
            "Evaluation du programme. Contact: contact@alpha.ma",
            &[
                ("/files/tdr.docx", "Termes de reference"),
                ("/files/budget.xlsx", "Budget"),
            ],
        ),
    )
    .await;
    serve(&server, "/files/tdr.docx", docx_bytes("Candidatures a tdr@alpha.ma")).await;
    Mock::given(method("GET"))
        .and(path("/files/budget.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
        .expect(0)
        .mount(&server)
        .await;

    serve_status(&server, "/p/beta/", 404).await;

    serve(
        &server,
        "/p/gamma/",
        detail_html(
            "Etude Gamma",
            "Etude de faisabilite sans contact.",
            &[("/files/annexe.pdf", "Annexe")],
        ),
    )
    .await;
    serve(&server, "/files/annexe.pdf", vec![b'%'; 4096]).await;

    server
}

#[tokio::test]
async fn test_full_run_merges_page_file_and_model_emails() {
    let server = mock_site().await;
    let mut config = config_for(&server);
    config.limits.max_attachment_bytes = 1024;

    let model = Arc::new(ScriptedModel {
        calls: AtomicUsize::new(0),
    });
    let harvester = Harvester::new(config).unwrap().with_model(model.clone());
    let report = harvester
        .run(&RunRequest::new("appels-doffres", 2, true), &NoProgress)
        .await;

    assert!(!report.cancelled);
    let urls: Vec<&str> = report.postings.iter().map(|p| p.record.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/p/alpha/", server.uri()),
            format!("{}/p/gamma/", server.uri()),
        ]
    );

    let alpha = &report.postings[0];
    assert_eq!(alpha.source, AnalysisSource::Model);
    assert_eq!(alpha.record.title, "Consultant Alpha");
    assert_eq!(alpha.record.date, "12/02/2026");
    assert_eq!(alpha.analysis.organization, "Association Alpha");
    assert_eq!(
        alpha.analysis.emails,
        vec![
            "contact@alpha.ma".to_string(),
            "model@alpha.ma".to_string(),
            "tdr@alpha.ma".to_string(),
        ]
    );
    assert_eq!(alpha.record.attachments.len(), 2);
    assert!(alpha.record.attachments[0].is_parsed());
    assert!(!alpha.record.attachments[1].is_parsed());
    assert!(alpha.record.file_emails.contains("tdr@alpha.ma"));
    assert!(!alpha.record.page_text.contains("Termes de reference"));
    assert!(!alpha.record.page_text.contains("Pied de page"));

    let gamma = &report.postings[1];
    assert_eq!(gamma.source, AnalysisSource::Fallback);
    assert_eq!(gamma.analysis.sector, "Other");
    assert!(gamma.analysis.emails.is_empty());
    assert!(!gamma.record.attachments[0].is_parsed());
    assert!(gamma.analysis.summary.ends_with("(1 file(s), 0 parsed)"));

    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.stats.postings_discovered, 3);
    assert_eq!(report.stats.postings_attempted, 3);
    assert_eq!(report.stats.postings_succeeded, 2);
    assert_eq!(report.stats.attachments_detected, 3);
    assert_eq!(report.stats.attachments_parsed, 1);
    assert_eq!(report.stats.model_analyses, 1);
    assert_eq!(report.stats.fallback_analyses, 1);
}

#[tokio::test]
async fn test_every_result_contains_page_and_file_emails() {
    let server = mock_site().await;
    let harvester = Harvester::new(config_for(&server)).unwrap();
    let report = harvester
        .run(&RunRequest::new("appels-doffres", 2, true), &NoProgress)
        .await;

    assert_eq!(report.postings.len(), 2);
    for posting in &report.postings {
        assert_eq!(posting.source, AnalysisSource::Fallback);
        for email in recognize_emails(&posting.record.page_text)
            .iter()
            .chain(posting.record.file_emails.iter())
        {
            assert!(
                posting.analysis.emails.contains(email),
                "{email} missing from {:?}",
                posting.analysis.emails
            );
        }
    }
}

#[tokio::test]
async fn test_metadata_only_run_fetches_no_documents() {
    let server = MockServer::start().await;
    serve(&server, "/offres-demploi/", listing_html(&["/p/delta/"])).await;
    serve(
        &server,
        "/p/delta/",
        detail_html("Poste Delta", "Ecrire a rh@delta.ma", &[("/files/fiche.pdf", "Fiche")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/fiche.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let harvester = Harvester::new(config_for(&server)).unwrap();
    let report = harvester
        .run(&RunRequest::new("offres-demploi", 1, false), &NoProgress)
        .await;

    assert_eq!(report.postings.len(), 1);
    let delta = &report.postings[0];
    assert_eq!(delta.record.attachments.len(), 1);
    assert!(delta.record.file_emails.is_empty());
    assert_eq!(delta.analysis.emails, vec!["rh@delta.ma".to_string()]);
}

#[tokio::test]
async fn test_unavailable_listing_page_does_not_stop_later_pages() {
    let server = MockServer::start().await;
    serve_status(&server, "/appels-doffres/", 500).await;
    serve(&server, "/appels-doffres/2/", listing_html(&["/p/eps/"])).await;
    serve(&server, "/p/eps/", detail_html("Eps", "Texte", &[])).await;

    let updates = Mutex::new(Vec::new());
    let observer = |fraction: f64, status: &str| {
        updates.lock().unwrap().push((fraction, status.to_string()));
    };
    let harvester = Harvester::new(config_for(&server)).unwrap();
    let report = harvester
        .run(&RunRequest::new("appels-doffres", 2, true), &observer)
        .await;

    assert_eq!(report.postings.len(), 1);
    let statuses: Vec<String> = updates.into_inner().unwrap().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        statuses,
        vec![
            "Listing page 1/2: 0 posting(s)".to_string(),
            "Listing page 2/2: 1 posting(s)".to_string(),
            "Posting 1/1".to_string(),
            "Done".to_string(),
        ]
    );

    let stats = HarvestStatistics::from_postings(&report.postings);
    assert_eq!(stats.total, 1);
    assert_eq!(stats.with_email, 0);
}
