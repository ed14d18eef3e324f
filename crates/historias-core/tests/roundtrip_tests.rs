//! Parse-then-render round trips
//!
//! Stories read from disk must survive into the three ADF shapes with
//! their text intact (up to bullet-prefix insertion on multi-item
//! acceptance lists).

use std::fs;

use historias_core::adf::AdfDocument;
use historias_core::reader;
use tempfile::TempDir;

#[test]
fn test_reader_to_adf_preserves_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stories.csv");
    fs::write(
        &path,
        "titulo,descripcion,criterio_aceptacion,subtareas,parent\n\
         Login,Quiero autenticarme,Credenciales válidas,\"Form;Validación\",\n\
         Perfil,\"Como usuario\nquiero editar mi perfil\",\"Guarda;Valida;Notifica\",,\n",
    )
    .unwrap();

    let stories = reader::read_file(&path).unwrap();
    assert_eq!(stories.len(), 2);

    for story in &stories {
        let description = AdfDocument::from_description(&story.description);
        assert_eq!(description.plain_text(), vec![story.description.clone()]);

        let acceptance = AdfDocument::from_acceptance_criteria(&story.acceptance_criteria);
        assert!(!acceptance.content.is_empty());
        for (paragraph, item) in acceptance
            .plain_text()
            .iter()
            .zip(story.acceptance_criteria.split(';').map(str::trim))
        {
            let text = paragraph.strip_prefix("\u{2022} ").unwrap_or(paragraph);
            assert_eq!(text, item);
        }

        let combined = AdfDocument::combined(&story.description, &story.acceptance_criteria);
        let texts = combined.plain_text();
        assert_eq!(texts[0], story.description);
        assert!(texts.len() >= 3, "combined document carries the separator");
    }
}

#[test]
fn test_subtask_splitting_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subtareas.csv");
    fs::write(
        &path,
        "titulo,descripcion,criterio_aceptacion,subtareas\n\
         A,D,C,\"uno;dos\"\n\
         B,D,C,\"uno\ndos\"\n",
    )
    .unwrap();

    let stories = reader::read_file(&path).unwrap();
    assert_eq!(stories[0].subtasks, stories[1].subtasks);
    assert_eq!(stories[0].subtasks, vec!["uno", "dos"]);
}
