use card_press::*;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_card_png(dir: &TempDir, name: &str, rgba: [u8; 4]) -> PathBuf {
    let path = dir.path().join(name);
    RgbaImage::from_pixel(123, 176, Rgba(rgba))
        .save(&path)
        .unwrap();
    path
}

// Low dpi keeps the rasterized pages small
fn test_options() -> ComposerOptions {
    ComposerOptions {
        dpi: 40,
        ..Default::default()
    }
}

#[tokio::test]
async fn folded_pdf_from_card_list_text() {
    let dir = TempDir::new().unwrap();
    let back = write_card_png(&dir, "back.png", [20, 20, 180, 255]);
    let hero = write_card_png(&dir, "hero.png", [180, 20, 20, 255]);
    let ally = write_card_png(&dir, "ally.png", [20, 180, 20, 255]);

    let list = format!(
        "{}\n0\n0\n{}\n{}\n\n",
        back.display(),
        hero.display(),
        ally.display()
    );
    let list_path = dir.path().join("cards.txt");
    tokio::fs::write(&list_path, &list).await.unwrap();

    let mut request = ComposeRequest::new(dir.path().join("out.pdf"), test_options());
    request.batches = load_card_list(&list_path).await.unwrap();

    let summary = compose_pdf(request.clone()).await.unwrap();
    assert_eq!(summary, ComposeSummary { cards: 2, pages: 1 });

    let bytes = tokio::fs::read(&request.output).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(!request.output.with_extension("tmp").exists());
}

#[tokio::test]
async fn two_sided_run_emits_front_and_back_pages() {
    let dir = TempDir::new().unwrap();
    let back = write_card_png(&dir, "back.png", [0, 0, 0, 255]);
    let fronts: Vec<PathBuf> = (0..5)
        .map(|i| write_card_png(&dir, &format!("front{i}.png"), [i as u8 * 40, 10, 10, 255]))
        .collect();

    let options = ComposerOptions {
        two_sided: true,
        ..test_options()
    };
    let mut request = ComposeRequest::new(dir.path().join("out.pdf"), options);
    request.batches.push(CardBatch {
        back_image: Some(back),
        back_bleed_mm: 0.0,
        front_bleed_mm: 0.0,
        fronts,
    });

    let summary = compose_pdf(request).await.unwrap();
    // 5 cards fit one 2x4 sheet side: one front page plus one back page
    assert_eq!(summary, ComposeSummary { cards: 5, pages: 2 });
}

#[tokio::test]
async fn existing_output_is_refused_without_overwrite() {
    let dir = TempDir::new().unwrap();
    let front = write_card_png(&dir, "front.png", [1, 2, 3, 255]);
    let output = dir.path().join("out.pdf");
    tokio::fs::write(&output, b"precious").await.unwrap();

    let mut request = ComposeRequest::new(&output, test_options());
    request.batches.push(CardBatch {
        back_image: None,
        back_bleed_mm: 0.0,
        front_bleed_mm: 0.0,
        fronts: vec![front],
    });

    let err = compose_pdf(request.clone()).await.unwrap_err();
    assert!(matches!(err, CardPressError::Layout(_)));
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"precious");

    request.overwrite = true;
    compose_pdf(request).await.unwrap();
    assert!(tokio::fs::read(&output).await.unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn unreadable_card_aborts_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let front = write_card_png(&dir, "front.png", [1, 2, 3, 255]);

    let mut request = ComposeRequest::new(dir.path().join("out.pdf"), test_options());
    request.batches.push(CardBatch {
        back_image: Some(dir.path().join("no-such-back.png")),
        back_bleed_mm: 0.0,
        front_bleed_mm: 0.0,
        fronts: vec![front],
    });

    let err = compose_pdf(request.clone()).await.unwrap_err();
    assert!(matches!(err, CardPressError::ImageLoad { .. }));
    assert!(!request.output.exists());
    assert!(!request.output.with_extension("tmp").exists());
}
