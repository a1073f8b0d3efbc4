//! Card composer: maps one `CardRecord` plus optional photo/assets onto the
//! fixed certificate design. Every coordinate here is a constant of the
//! design; only text content varies with the record. Missing optional assets
//! degrade slot-by-slot, never aborting the composition.

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;

use crate::assets::CardAssets;
use crate::layout::{
    Color, Fill, FontFamily, Layout, Node, Rect, TextStyle, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use crate::normalize::NormalizedPhoto;
use crate::record::CardRecord;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

const INK: Color = Color([0x74, 0x70, 0x5E]);
const NAME_INK: Color = Color([0x6E, 0x66, 0x38]);
const PLACEHOLDER_INK: Color = Color([0x9C, 0xA3, 0xAF]);

const CARD_FILL: Color = Color([0xFF, 0xFE, 0xF9]);
/// Corner rounding of the card body, scaled with the canvas from the
/// reference document size. Opaque design constant like the canvas height.
const CARD_CORNER_RADIUS: f64 = 40.1214953271;

const PHOTO_SIZE: f64 = 500.0;
/// The frame overlay is drawn at 113% of the photo so its ring surrounds it.
const FRAME_SCALE: f64 = 1.13;

const STRIP_TILE_W: f64 = 72.0;
const STRIP_TILE_H: f64 = 36.0;
/// Tiles overlap by 3 units so the strip reads as one continuous band.
const STRIP_STEP: f64 = STRIP_TILE_W - 3.0;
const STRIP_TILES: usize = 15;

pub fn compose(
    record: &CardRecord,
    photo: Option<&NormalizedPhoto>,
    assets: &CardAssets,
) -> Result<Layout, ComposeError> {
    compose_at(record, photo, assets, Local::now().date_naive())
}

/// Composition with an explicit issue date. The issue date is always the
/// composition clock, not the record's `created_at`.
pub fn compose_at(
    record: &CardRecord,
    photo: Option<&NormalizedPhoto>,
    assets: &CardAssets,
    issued_on: NaiveDate,
) -> Result<Layout, ComposeError> {
    validate(record)?;

    let mut nodes = Vec::new();

    // Off-white card body under everything else, so the card never renders
    // on a transparent canvas even with every asset missing.
    nodes.push(
        Node::container(
            Rect::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            Some(Fill::Solid(CARD_FILL)),
            Vec::new(),
        )
        .rounded(CARD_CORNER_RADIUS),
    );

    // Full-bleed background pattern.
    if let Some(bg) = &assets.background {
        nodes.push(Node::image(
            Rect::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            bg.clone(),
        ));
    }

    // Decorative gradient bar hanging off the right edge.
    nodes.push(
        Node::container(
            Rect::new(CANVAS_WIDTH - 90.0, 280.0, 140.0, 400.0),
            Some(Fill::gradient(
                -100.0,
                &[
                    Color([0xA9, 0x78, 0xAF]),
                    Color([0xDE, 0x79, 0xA4]),
                    Color([0xF5, 0xA9, 0xBD]),
                ],
            )),
            Vec::new(),
        )
        .rotated(-30.0),
    );

    // Base certificate artwork, inset 32 on every side.
    if let Some(base) = &assets.card_base {
        nodes.push(Node::image(
            Rect::new(32.0, 32.0, CANVAS_WIDTH - 64.0, CANVAS_HEIGHT - 64.0),
            base.clone(),
        ));
    }

    nodes.extend(issue_block(record, issued_on));
    nodes.push(photo_slot(photo, assets));
    nodes.extend(fixed_decorations(assets));
    nodes.extend(address_block(record));
    nodes.extend(name_block(record));
    nodes.extend(logo_strips(assets));
    nodes.extend(edge_bars());

    Ok(Layout::canvas(nodes))
}

fn validate(record: &CardRecord) -> Result<(), ComposeError> {
    if record.name.trim().is_empty() {
        return Err(ComposeError::InvalidRecord("name is empty".into()));
    }
    if record.address_line.trim().is_empty() {
        return Err(ComposeError::InvalidRecord("addressLine is empty".into()));
    }
    Ok(())
}

/// Issue date and zero-padded record number, right-aligned in the top-right
/// corner.
fn issue_block(record: &CardRecord, issued_on: NaiveDate) -> Vec<Node> {
    let style = TextStyle::new(FontFamily::Sans, 20.0, 400, INK).anchored_end();
    let date_text = format!(
        "{}年 {}月 {}日交付",
        issued_on.year(),
        issued_on.month(),
        issued_on.day()
    );
    let number_text = format!("No. {:06}", record.resident_number);
    vec![
        Node::text(Rect::new(752.0, 64.0, 264.0, 32.0), date_text, style.clone()),
        Node::text(
            Rect::new(752.0, 96.0, 264.0, 32.0),
            number_text,
            TextStyle { weight: 700, ..style },
        ),
    ]
}

/// Circular photo slot in the canvas center: frame ring over the photo, or a
/// placeholder text when no photo was supplied.
fn photo_slot(photo: Option<&NormalizedPhoto>, assets: &CardAssets) -> Node {
    let slot = Rect::new(
        (CANVAS_WIDTH - PHOTO_SIZE) / 2.0,
        (CANVAS_HEIGHT - PHOTO_SIZE) / 2.0,
        PHOTO_SIZE,
        PHOTO_SIZE,
    );

    let Some(photo) = photo else {
        let (cx, cy) = slot.center();
        return Node::container(
            slot,
            None,
            vec![Node::text(
                Rect::new(cx - 20.0, cy - 11.0, 40.0, 22.0),
                "写真",
                TextStyle::new(FontFamily::Sans, 14.0, 400, PLACEHOLDER_INK),
            )],
        );
    };

    let mut children = Vec::new();
    if let Some(frame) = &assets.photo_frame {
        let frame_size = PHOTO_SIZE * FRAME_SCALE;
        let inset = (frame_size - PHOTO_SIZE) / 2.0;
        children.push(Node::circle_image(
            Rect::new(slot.x - inset, slot.y - inset, frame_size, frame_size),
            frame.clone(),
        ));
    }
    children.push(Node::circle_image(slot, photo.blob().clone()));
    Node::container(slot, None, children)
}

/// Seals, crest, barcode and ornament lines at their fixed positions. Any
/// missing asset simply leaves its slot empty.
fn fixed_decorations(assets: &CardAssets) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut push = |blob: &Option<crate::blob::EmbeddableBlob>, rect: Rect| {
        if let Some(b) = blob {
            nodes.push(Node::image(rect, b.clone()));
        }
    };

    push(&assets.department, Rect::new(805.0, 120.0, 70.0, 221.2));
    push(&assets.crest, Rect::new(650.0, 70.0, 140.0, 140.0));
    push(&assets.barcode, Rect::new(64.0, 170.0, 250.0, 18.0));
    push(
        &assets.ornament_line,
        Rect::new((CANVAS_WIDTH - 150.0) / 2.0, 42.0, 150.0, 16.0),
    );
    push(
        &assets.ornament_line,
        Rect::new((CANVAS_WIDTH - 150.0) / 2.0, CANVAS_HEIGHT - 58.0, 150.0, 16.0),
    );
    push(&assets.mayor_seal, Rect::new(650.0, 400.0, 220.0, 220.0));
    push(
        &assets.side_ornament,
        Rect::new(CANVAS_WIDTH - 57.0, CANVAS_HEIGHT + 27.0 - 300.0, 25.0, 300.0),
    );
    nodes
}

/// City wordmark, 住所 label and the two address lines, anchored to the
/// bottom-left corner.
fn address_block(record: &CardRecord) -> Vec<Node> {
    // Stacked line heights from the design: 66 + 66 big text, 16 gap,
    // 38.4 label, 6 gap, 33 + 33 address lines, inset 56 from the bottom.
    let top = CANVAS_HEIGHT - 56.0 - 258.4;
    let display = TextStyle::new(FontFamily::Serif, 60.0, 400, INK);
    let label = TextStyle::new(FontFamily::Serif, 24.0, 600, INK).letter_spacing(24.0);
    let line = TextStyle::new(FontFamily::Serif, 30.0, 600, INK);

    let street_line = format!("{} {}", record.street_number, record.address_line);
    let apartment_line = record.apartment_info.clone().unwrap_or_default();

    vec![
        Node::text(Rect::new(64.0, top, 440.0, 66.0), "KAMITSUBAKI", display.clone()),
        Node::text(Rect::new(64.0, top + 66.0, 440.0, 66.0), "CITY", display),
        Node::text(Rect::new(64.0, top + 148.0, 300.0, 38.4), "住所", label),
        Node::text(Rect::new(64.0, top + 192.4, 700.0, 33.0), street_line, line.clone())
            .fitted(700.0),
        Node::text(Rect::new(64.0, top + 225.4, 700.0, 33.0), apartment_line, line)
            .fitted(700.0),
    ]
}

fn name_block(record: &CardRecord) -> Vec<Node> {
    let label = TextStyle::new(FontFamily::Serif, 24.0, 600, NAME_INK).letter_spacing(24.0);
    let name = TextStyle::new(FontFamily::Serif, 48.0, 800, NAME_INK);
    vec![
        Node::text(Rect::new(64.0, 56.0, 300.0, 38.4), "氏名", label),
        Node::text(Rect::new(64.0, 100.4, 560.0, 52.8), record.name.clone(), name)
            .fitted(560.0),
    ]
}

/// Repeated logo band along the top and bottom edges; the bottom band is
/// rotated 180 degrees.
fn logo_strips(assets: &CardAssets) -> Vec<Node> {
    let Some(logo) = &assets.logo else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(STRIP_TILES * 2);
    for i in 0..STRIP_TILES {
        let x = i as f64 * STRIP_STEP;
        nodes.push(Node::image(
            Rect::new(x, 0.0, STRIP_TILE_W, STRIP_TILE_H),
            logo.clone(),
        ));
    }
    for i in 0..STRIP_TILES {
        let x = i as f64 * STRIP_STEP;
        nodes.push(
            Node::image(
                Rect::new(x, CANVAS_HEIGHT - STRIP_TILE_H, STRIP_TILE_W, STRIP_TILE_H),
                logo.clone(),
            )
            .rotated(180.0),
        );
    }
    nodes
}

/// Two stacked bars down the left edge: gradient over solid ink.
fn edge_bars() -> Vec<Node> {
    let total_h = CANVAS_HEIGHT * 0.65;
    let gradient_h = total_h * 0.6;
    vec![
        Node::container(
            Rect::new(0.0, 0.0, 32.0, gradient_h),
            Some(Fill::gradient(
                135.0,
                &[
                    Color([0x6A, 0xAF, 0xE7]),
                    Color([0xDA, 0xD0, 0xE9]),
                    Color([0xF7, 0xDA, 0xCA]),
                ],
            )),
            Vec::new(),
        ),
        Node::container(
            Rect::new(0.0, gradient_h, 32.0, total_h - gradient_h),
            Some(Fill::Solid(INK)),
            Vec::new(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::EmbeddableBlob;
    use crate::layout::{Clip, NodeKind};
    use crate::normalize::{normalize, NormalizeConfig};
    use crate::record::StreetNumber;
    use chrono::Utc;

    fn record(number: u32, name: &str) -> CardRecord {
        CardRecord {
            id: "rec_1".into(),
            owner_id: "user_1".into(),
            resident_number: number,
            name: name.into(),
            photo_url: String::new(),
            street_number: StreetNumber::Third,
            address_line: "1丁目2-3".into(),
            apartment_info: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_photo() -> NormalizedPhoto {
        let img = image::RgbaImage::from_pixel(40, 40, image::Rgba([9, 9, 9, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        normalize(&buf.into_inner(), &NormalizeConfig::default()).unwrap()
    }

    fn has_photo_placeholder(layout: &Layout) -> bool {
        layout.contains_text("写真")
    }

    fn is_circle_image(node: &Node) -> bool {
        matches!(node.kind, NodeKind::Image { clip: Clip::Circle, .. })
    }

    fn assets_with_logo() -> CardAssets {
        CardAssets {
            logo: Some(EmbeddableBlob::new("image/png", vec![1, 2, 3])),
            photo_frame: Some(EmbeddableBlob::new("image/png", vec![4, 5, 6])),
            ..CardAssets::default()
        }
    }

    #[test]
    fn record_number_is_zero_padded_to_six() {
        let layout =
            compose(&record(42, "花譜"), None, &CardAssets::default()).unwrap();
        assert!(layout.contains_text("No. 000042"));
    }

    #[test]
    fn issue_date_is_the_composition_clock() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let layout =
            compose_at(&record(1, "理芽"), None, &CardAssets::default(), date).unwrap();
        assert!(layout.contains_text("2026年 8月 23日交付"));
    }

    #[test]
    fn missing_photo_degrades_to_placeholder() {
        let layout = compose(&record(7, "春猿火"), None, &assets_with_logo()).unwrap();
        assert!(has_photo_placeholder(&layout));
    }

    #[test]
    fn photo_slot_is_circle_clipped_with_frame_overlay() {
        let photo = test_photo();
        let layout =
            compose(&record(7, "幸祜"), Some(&photo), &assets_with_logo()).unwrap();
        assert!(!has_photo_placeholder(&layout));
        let circle_images: usize = layout
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Container { children, .. } => {
                    Some(children.iter().filter(|c| is_circle_image(c)).count())
                }
                _ => None,
            })
            .sum();
        // Frame ring + photo.
        assert_eq!(circle_images, 2);
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = compose(&record(1, ""), None, &CardAssets::default()).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidRecord(_)));
    }

    #[test]
    fn address_joins_street_and_line() {
        let mut rec = record(5, "ヰ世界情緒");
        rec.apartment_info = Some("カムパネルラ荘 101".into());
        let layout = compose(&rec, None, &CardAssets::default()).unwrap();
        assert!(layout.contains_text("参番街 1丁目2-3"));
        assert!(layout.contains_text("カムパネルラ荘 101"));
    }

    #[test]
    fn absent_apartment_renders_an_empty_line() {
        let layout = compose(&record(5, "存流"), None, &CardAssets::default()).unwrap();
        assert!(layout.contains_text(""));
    }

    #[test]
    fn logo_strips_tile_fifteen_times_each_edge() {
        let assets = CardAssets {
            logo: Some(EmbeddableBlob::new("image/png", vec![0])),
            ..CardAssets::default()
        };
        let layout = compose(&record(3, "明透"), None, &assets).unwrap();
        assert_eq!(layout.image_count(), 30);
        let rotated = layout.nodes.iter().filter(|n| n.rotate == 180.0).count();
        assert_eq!(rotated, 15);
    }

    #[test]
    fn compositions_share_no_nodes() {
        let a = compose(&record(1, "AAA"), None, &CardAssets::default()).unwrap();
        let b = compose(&record(2, "BBB"), None, &CardAssets::default()).unwrap();
        assert!(a.contains_text("No. 000001"));
        assert!(b.contains_text("No. 000002"));
        assert!(!a.contains_text("No. 000002"));
    }

    #[test]
    fn card_body_is_the_first_node_even_without_assets() {
        let layout = compose(&record(1, "花譜"), None, &CardAssets::default()).unwrap();
        let first = &layout.nodes[0];
        assert_eq!(first.rect, Rect::new(0.0, 0.0, 1080.0, 681.0560747664));
        match &first.kind {
            NodeKind::Container { fill, radius, .. } => {
                assert_eq!(*fill, Some(Fill::Solid(Color([0xFF, 0xFE, 0xF9]))));
                assert_eq!(*radius, 40.1214953271);
            }
            other => panic!("expected the card body container, got {other:?}"),
        }
    }

    #[test]
    fn canvas_dimensions_are_the_design_constants() {
        let layout = compose(&record(1, "V.W.P"), None, &CardAssets::default()).unwrap();
        assert_eq!(layout.width, 1080.0);
        assert_eq!(layout.height, 681.0560747664);
    }
}
