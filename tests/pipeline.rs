use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use image_translator_rust::layout::{merge_fragments, MergeOptions};
use image_translator_rust::render::{self, TextStyle};
use image_translator_rust::{ocr, output, Color};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn summarize(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|text| text.trim_end().replace('\n', " / "))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[test]
fn recognized_lines_merge_into_paragraphs() {
    let fragments = ocr::load_fragments_file(&fixture("baidu_accurate.json")).unwrap();
    let paragraphs = merge_fragments(fragments, &MergeOptions::default()).unwrap();
    let texts = paragraphs.iter().map(|p| p.text()).collect::<Vec<_>>();
    insta::assert_snapshot!(
        summarize(&texts),
        @"Welcome to the / annual meeting | Room 204 | Doors open at 9:00"
    );

    let heading = paragraphs[0].bbox();
    assert_eq!(
        (heading.left, heading.top, heading.right, heading.bottom),
        (42, 30, 252, 89)
    );
}

#[test]
fn report_pairs_originals_with_translations() {
    let dir = tempfile::tempdir().unwrap();
    let fragments = ocr::load_fragments_file(&fixture("baidu_accurate.json")).unwrap();
    let paragraphs = merge_fragments(fragments, &MergeOptions::default()).unwrap();
    let originals = paragraphs
        .iter()
        .map(|p| p.text().to_string())
        .collect::<Vec<_>>();
    let translations = vec![
        "欢迎参加\n年度会议".to_string(),
        "204 室".to_string(),
        "translation failed: rate limited".to_string(),
    ];

    let paths = output::OutputPaths::for_input(Path::new("poster.png"), &dir.path().join("result"));
    output::write_report(&paths.report, &originals, &translations).unwrap();
    let report = std::fs::read_to_string(&paths.report).unwrap();
    assert!(report.starts_with("Original text:\nWelcome to the\nannual meeting\n"));
    assert!(report.ends_with("Translation:\n欢迎参加\n年度会议\n204 室\ntranslation failed: rate limited"));
}

#[test]
fn overlay_erases_text_with_surrounding_color() {
    let background = Rgb([235, 220, 180]);
    let mut image = RgbImage::from_pixel(120, 60, background);
    for x in 22..70 {
        for y in 14..24 {
            image.put_pixel(x, y, Rgb([30, 30, 30]));
        }
    }
    let fragments = vec![image_translator_rust::Fragment::new(
        "Menu",
        image_translator_rust::Location::new(20, 12, 60, 14),
    )];
    let paragraphs = merge_fragments(fragments, &MergeOptions::default()).unwrap();
    let style = TextStyle {
        font_scale: 0.8,
        min_font_size: 10.0,
        color_threshold: 30.0,
    };
    let blocks = render::paragraph_blocks(&image, &paragraphs, &[String::new()], &style);
    assert_eq!(blocks[0].background, Color::new(235, 220, 180));
    assert_eq!(blocks[0].foreground, Color::new(30, 30, 30));

    let svg = render::render_svg(&image, &blocks, None).unwrap();
    let bytes = render::render_svg_bytes(&svg, ImageFormat::Png, None).unwrap();
    let rendered = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(rendered.get_pixel(40, 18), &background);
    assert_eq!(rendered.get_pixel(100, 50), &background);
}
