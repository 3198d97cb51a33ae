use promob_extractor::extractors::fingerprint::canonical_form;
use promob_extractor::extractors::{FieldKey, MonetaryNormalizer, ProductLineTable, XmlExtractor};
use promob_extractor::{ExtractionOrchestrator, ExtractionWarning, SectionName};
use std::collections::BTreeSet;
use std::sync::Arc;

const COZINHA: &str = include_str!("fixtures/cozinha_unique.xml");
const DORMITORIO: &str = include_str!("fixtures/dormitorio_essenza.xml");

const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<LISTING LIBRARY="Unique">
  <CATEGORY DESCRIPTION="Caixas">
    <ITEM DESCRIPTION="Balcão" QUANTITY="1" TOTALPRICE="R$ 1.500,00"/>
  </CATEGORY>
  <CATEGORY DESCRIPTION="Portas">
    <ITEM DESCRIPTION="Porta" QUANTITY="1" TOTALPRICE="2.500,00"/>
  </CATEGORY>
</LISTING>"#;

fn sections(names: &[SectionName]) -> BTreeSet<SectionName> {
    names.iter().copied().collect()
}

#[test]
fn minimal_document_end_to_end() {
    let result = ExtractionOrchestrator::default().run(MINIMAL, None).unwrap();

    assert_eq!(result.valor_total.canonical(), "4000.00");
    assert_eq!(result.valor_total_formatado, "R$ 4.000,00");
    assert_eq!(result.sections.len(), 2);
    assert_eq!(result.record_count(SectionName::Caixa), 1);
    assert_eq!(result.record_count(SectionName::Portas), 1);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert!(result.fingerprint.is_some());
}

#[test]
fn fingerprint_matches_published_canonical_form() {
    let result = ExtractionOrchestrator::default().run(MINIMAL, None).unwrap();
    assert_eq!(
        canonical_form(&result),
        "linha:6:unique\n[caixa]\n#0\ndescricao:7:Balcão\nquantidade:1:1\nvalor_total:7:1500.00\n\
         [portas]\n#0\ndescricao:5:Porta\nquantidade:1:1\nvalor_total:7:2500.00\n"
    );
    assert_eq!(
        result.fingerprint.unwrap().as_str(),
        "27b9a29643210cfd64598a21cab2e0ea34f79f42a3bb17065754a6496d805fef"
    );
}

#[test]
fn fingerprint_is_idempotent_across_orchestrators() {
    let first = ExtractionOrchestrator::default().run(COZINHA, None).unwrap();
    for _ in 0..5 {
        let again = ExtractionOrchestrator::default().run(COZINHA, None).unwrap();
        assert_eq!(first.fingerprint, again.fingerprint);
    }
}

#[test]
fn fingerprint_ignores_number_formatting() {
    let us_layout = MINIMAL.replace("R$ 1.500,00", "1,500.00").replace("2.500,00", "2500");
    let a = ExtractionOrchestrator::default().run(MINIMAL, None).unwrap();
    let b = ExtractionOrchestrator::default().run(&us_layout, None).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);

    let changed = MINIMAL.replace("2.500,00", "2.500,01");
    let c = ExtractionOrchestrator::default().run(&changed, None).unwrap();
    assert_ne!(a.fingerprint, c.fingerprint);
}

#[test]
fn full_unique_export() {
    let result = ExtractionOrchestrator::default().run(COZINHA, None).unwrap();

    assert_eq!(result.linha_detectada.as_deref(), Some("unique"));
    assert_eq!(result.nome_ambiente.as_deref(), Some("Cozinha Gourmet"));
    assert!(!result.low_confidence);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    assert_eq!(result.record_count(SectionName::Caixa), 3);
    assert_eq!(result.record_count(SectionName::Portas), 2);
    assert_eq!(result.record_count(SectionName::Ferragens), 3);
    assert_eq!(result.record_count(SectionName::Paineis), 1);
    assert_eq!(result.record_count(SectionName::PortaPerfil), 1);
    assert_eq!(result.record_count(SectionName::BrilhartColor), 1);

    // Recomputed from the items; the export's TOTALS element says 99.999,99.
    assert_eq!(result.valor_total.canonical(), "11011.00");

    let perfil = &result.records(SectionName::PortaPerfil)[0];
    assert_eq!(perfil.text(FieldKey::Comprimento), Some("716"));
    assert_eq!(perfil.text(FieldKey::Acabamento), Some("Alumínio bronze"));

    let brilhart = &result.records(SectionName::BrilhartColor)[0];
    assert_eq!(brilhart.text(FieldKey::Cor), Some("Vermelho Ferrari"));
    assert_eq!(brilhart.text(FieldKey::Espessura), Some("18"));
}

#[test]
fn essenza_export_with_child_elements() {
    let result = ExtractionOrchestrator::default().run(DORMITORIO, None).unwrap();

    assert_eq!(result.linha_detectada.as_deref(), Some("essenza"));
    assert_eq!(result.nome_ambiente.as_deref(), Some("Dormitório Casal"));
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.record_count(SectionName::Caixa), 2);
    assert_eq!(result.record_count(SectionName::Ferragens), 1);

    let guarda_roupa = &result.records(SectionName::Caixa)[0];
    assert_eq!(guarda_roupa.text(FieldKey::Referencia), Some("GR-4P"));
    assert_eq!(guarda_roupa.text(FieldKey::Largura), Some("2000"));
    assert_eq!(result.valor_total.canonical(), "8000.30");
}

#[test]
fn corrupt_portas_block_does_not_affect_ferragens() {
    let baseline = ExtractionOrchestrator::default().run(COZINHA, None).unwrap();

    let corrupted = COZINHA
        .replace(r#"DESCRIPTION="Porta lisa 18mm""#, "")
        .replace(r#"QUANTITY="3" WIDTH="596""#, r#"WIDTH="596""#)
        .replace(r#"TOTALPRICE="R$ 295,50""#, r#"TOTALPRICE="R$ 9.999.999.999,00""#);
    let result = ExtractionOrchestrator::default().run(&corrupted, None).unwrap();

    assert_eq!(result.record_count(SectionName::Portas), 0);
    assert_eq!(
        result.record_count(SectionName::Ferragens),
        baseline.record_count(SectionName::Ferragens)
    );
    assert_eq!(result.records(SectionName::Ferragens), baseline.records(SectionName::Ferragens));
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, ExtractionWarning::SectionExtraction { section: SectionName::Portas, .. })));
}

#[test]
fn partial_request_returns_only_requested_sections() {
    let wanted = sections(&[SectionName::Caixa]);
    let result = ExtractionOrchestrator::default().run(COZINHA, Some(&wanted)).unwrap();

    assert_eq!(result.sections.keys().copied().collect::<Vec<_>>(), vec![SectionName::Caixa]);
    assert!(result.warnings.is_empty());
    assert_eq!(result.valor_total.canonical(), "6105.40");
}

#[test]
fn request_for_absent_section_is_not_an_error() {
    let wanted = SectionName::parse_filter(r#"["FERRAGENS", "paineis"]"#).unwrap();
    let result = ExtractionOrchestrator::default().run(MINIMAL, Some(&wanted)).unwrap();
    assert!(result.is_empty());
    assert!(matches!(
        result.warnings.as_slice(),
        [ExtractionWarning::NoExtractableContent { .. }]
    ));
}

#[test]
fn extractor_can_be_used_without_orchestrator() {
    let table = ProductLineTable::builtin();
    let normalizer = MonetaryNormalizer::default();
    let result = XmlExtractor::new(&table, &normalizer).extract(MINIMAL, None).unwrap();
    assert_eq!(result.total_records(), 2);
    assert!(result.fingerprint.is_none());
}

fn synthetic_document(tag: usize) -> (String, String) {
    let description = format!("Peça exclusiva {}", tag);
    let total = format!("{}.{:03},{:02}", tag + 1, tag * 7 % 1000, tag % 100);
    let xml = format!(
        r#"<LISTING LIBRARY="Unique"><AMBIENT DESCRIPTION="Ambiente {tag}"/>
<CATEGORY DESCRIPTION="Ferragens">
  <ITEM DESCRIPTION="{description}" QUANTITY="{tag}" TOTALPRICE="{total}"/>
</CATEGORY></LISTING>"#
    );
    (xml, description)
}

#[test]
fn concurrent_runs_do_not_share_state() {
    let orchestrator = Arc::new(ExtractionOrchestrator::default());

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let orchestrator = Arc::clone(&orchestrator);
            scope.spawn(move || {
                for round in 0..25 {
                    let tag = worker * 100 + round;
                    let (xml, description) = synthetic_document(tag);
                    let result = orchestrator.run(&xml, None).unwrap();
                    let expected = MonetaryNormalizer::default()
                        .parse(format!("{}.{:03},{:02}", tag + 1, tag * 7 % 1000, tag % 100).as_str());

                    assert_eq!(result.nome_ambiente, Some(format!("Ambiente {}", tag)));
                    assert_eq!(result.total_records(), 1);
                    let record = &result.records(SectionName::Ferragens)[0];
                    assert_eq!(record.text(FieldKey::Descricao), Some(description.as_str()));
                    assert_eq!(record.text(FieldKey::Quantidade), Some(tag.to_string().as_str()));
                    assert_eq!(result.valor_total.amount(), &expected);
                }
            });
        }
    });
}

#[test]
fn malformed_document_is_rejected_without_partial_result() {
    let cut = COZINHA.find(r#"<CATEGORY DESCRIPTION="Portas">"#).unwrap();
    let failure = ExtractionOrchestrator::default()
        .run(&COZINHA[..cut], None)
        .unwrap_err();
    assert!(!failure.report.valid);
    assert_eq!(failure.report.errors.len(), 1);

    let json = serde_json::to_value(&failure).unwrap();
    assert_eq!(json["valid"], false);
    assert!(json.get("reason").is_none());
}

#[test]
fn success_json_shape() {
    let result = ExtractionOrchestrator::default().run(MINIMAL, None).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    for key in ["linha_detectada", "nome_ambiente", "sections", "valor_total", "fingerprint", "warnings"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(json["valor_total"], "4000.00");
    assert_eq!(json["sections"]["caixa"][0]["valor_total"], "1500.00");
    assert_eq!(json["sections"]["caixa"][0]["valor_total_formatado"], "R$ 1.500,00");
    assert_eq!(json["sections"]["portas"][0]["descricao"], "Porta");
}

#[test]
fn validation_probe_matches_extraction() {
    let orchestrator = ExtractionOrchestrator::default();
    let report = orchestrator.validate(COZINHA);
    assert!(report.valid);
    assert_eq!(report.available_sections.len(), 6);

    let result = orchestrator.run(COZINHA, None).unwrap();
    assert_eq!(
        report.available_sections,
        result.sections.keys().copied().collect::<BTreeSet<_>>()
    );
}
