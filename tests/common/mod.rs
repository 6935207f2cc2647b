use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// A positioned text run on a fixture page: `(text, x, y)` in PDF user
/// space (y grows upward).
pub type TextRun<'a> = (&'a str, i64, i64);

/// Build a PDF whose pages contain individually placed text runs, so the
/// extracted fragments carry distinct, predictable positions.
pub fn create_positioned_pdf(
    path: &Path,
    pages: &[Vec<TextRun<'_>>],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();

    for runs in pages {
        let mut operations = Vec::new();
        for (text, x, y) in runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

/// Lay a cell grid out on one page: rows top-down, cells left-to-right, so
/// reading order matches the grid order.
pub fn create_table_pdf(
    path: &Path,
    rows: &[&[&str]],
) -> Result<(), Box<dyn std::error::Error>> {
    let runs = rows
        .iter()
        .enumerate()
        .flat_map(|(row_index, cells)| {
            cells.iter().enumerate().map(move |(col_index, cell)| {
                (
                    *cell,
                    60 + 110 * col_index as i64,
                    760 - 24 * row_index as i64,
                )
            })
        })
        .collect::<Vec<_>>();
    create_positioned_pdf(path, &[runs])
}
