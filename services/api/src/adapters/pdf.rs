//! services/api/src/adapters/pdf.rs
//!
//! This module contains the `GenPdfRenderer`, the implementation of the
//! `DocumentRenderer` port. It lays out a certificate, offer letter or MoU with
//! `genpdf` and embeds a QR code pointing at the public verification page.
//!
//! The QR code is rasterised to a PNG in a temporary file because genpdf only
//! loads images from disk; the file must outlive `Document::render`.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use genpdf::elements::{Break, Image as PdfImage, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element as _};
use png::{BitDepth, ColorType, Encoder as PngEncoder};
use qrcode::types::Color;
use qrcode::QrCode;
use tempfile::NamedTempFile;
use veridant_core::domain::{Certificate, CollegeMou, OfferLetter};
use veridant_core::ports::{DocumentRenderer, PortError, PortResult, RenderableDocument};

const COMPANY_NAME: &str = "VeridantAI";
const QR_MODULE_PX: usize = 8;
const QR_QUIET_ZONE: usize = 4;
const QR_DPI: f64 = 300.0;

/// Renders documents to PDF with a font family loaded from `font_dir`.
#[derive(Clone, Debug)]
pub struct GenPdfRenderer {
    font_dir: PathBuf,
    font_family: String,
}

impl GenPdfRenderer {
    pub fn new(font_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self {
            font_dir: font_dir.into(),
            font_family: font_family.into(),
        }
    }

    fn new_document(&self, title: &str) -> PortResult<Document> {
        let family = genpdf::fonts::from_files(&self.font_dir, &self.font_family, None)
            .map_err(|e| {
                PortError::Unexpected(format!(
                    "Failed to load font family '{}' from {}: {}",
                    self.font_family,
                    self.font_dir.display(),
                    e
                ))
            })?;
        let mut doc = Document::new(family);
        doc.set_title(title);
        doc.set_font_size(11);
        doc.set_line_spacing(1.25);

        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(15);
        doc.set_page_decorator(decorator);
        Ok(doc)
    }
}

//=========================================================================================
// Layout Helpers
//=========================================================================================

fn heading(doc: &mut Document, title: &str, reference: &str) {
    doc.push(
        Paragraph::new(COMPANY_NAME)
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(14)),
    );
    doc.push(Break::new(1));
    doc.push(
        Paragraph::new(title)
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(20)),
    );
    doc.push(Paragraph::new(format!("Reference: {reference}")).aligned(Alignment::Center));
    doc.push(Break::new(2));
}

fn field(doc: &mut Document, label: &str, value: &str) {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(format!("{label}: "), Style::new().bold()));
    p.push(value.to_string());
    doc.push(p);
}

fn optional_field(doc: &mut Document, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        field(doc, label, value);
    }
}

fn date(d: NaiveDate) -> String {
    d.format("%d %B %Y").to_string()
}

/// Encodes `url` as a QR code and writes it to a temporary PNG.
fn qr_png(url: &str) -> PortResult<NamedTempFile> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| PortError::Unexpected(format!("Failed to encode QR code: {e}")))?;
    let modules = code.width();
    let colors = code.to_colors();

    let side = (modules + 2 * QR_QUIET_ZONE) * QR_MODULE_PX;
    let mut raw = vec![255u8; side * side * 3];
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let (mx, my) = (i % modules + QR_QUIET_ZONE, i / modules + QR_QUIET_ZONE);
        for y in my * QR_MODULE_PX..(my + 1) * QR_MODULE_PX {
            let row = y * side * 3;
            for x in mx * QR_MODULE_PX..(mx + 1) * QR_MODULE_PX {
                raw[row + x * 3..row + x * 3 + 3].fill(0);
            }
        }
    }

    let io_err =
        |e: std::io::Error| PortError::Unexpected(format!("Failed to write QR image: {e}"));
    let png_err =
        |e: png::EncodingError| PortError::Unexpected(format!("Failed to write QR image: {e}"));

    let mut tmp = NamedTempFile::new().map_err(io_err)?;
    {
        let mut encoder = PngEncoder::new(tmp.as_file_mut(), side as u32, side as u32);
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(png_err)?;
        writer.write_image_data(&raw).map_err(png_err)?;
    }
    Ok(tmp)
}

/// The verification block at the bottom of every document.
fn verification_footer(
    doc: &mut Document,
    qr: &NamedTempFile,
    reference: &str,
    url: &str,
) -> PortResult<()> {
    let mut image = PdfImage::from_path(qr.path())
        .map_err(|e| PortError::Unexpected(format!("Failed to load QR image: {e}")))?;
    image.set_dpi(QR_DPI);
    image.set_alignment(Alignment::Center);

    doc.push(Break::new(2));
    doc.push(image);
    doc.push(
        Paragraph::new(reference)
            .aligned(Alignment::Center)
            .styled(Style::new().bold()),
    );
    doc.push(
        Paragraph::new(format!("Verify this document at {url}"))
            .aligned(Alignment::Center)
            .styled(Style::new().with_font_size(9)),
    );
    doc.push(
        Paragraph::new(format!(
            "Generated on {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ))
        .aligned(Alignment::Center)
        .styled(Style::new().italic().with_font_size(8)),
    );
    Ok(())
}

//=========================================================================================
// Per-kind Bodies
//=========================================================================================

fn certificate_body(doc: &mut Document, c: &Certificate) {
    doc.push(Paragraph::new("This is to certify that").aligned(Alignment::Center));
    doc.push(
        Paragraph::new(c.recipient_name.as_str())
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(18)),
    );
    doc.push(
        Paragraph::new(format!("has successfully completed {}", c.program_title))
            .aligned(Alignment::Center),
    );
    doc.push(Break::new(2));
    field(doc, "Certificate type", &c.certificate_type.replace('_', " "));
    field(doc, "Issue date", &date(c.issue_date));
    optional_field(doc, "Valid until", c.valid_until.map(date).as_deref());
    optional_field(doc, "Grade", c.grade.as_deref());
    optional_field(doc, "Mentor", c.mentor_name.as_deref());
}

fn offer_body(doc: &mut Document, o: &OfferLetter) {
    doc.push(Paragraph::new(format!("Dear {},", o.candidate_name)));
    doc.push(Break::new(1));
    doc.push(Paragraph::new(format!(
        "We are pleased to offer you the position of {} in the {} department at {}.",
        o.position, o.department, COMPANY_NAME
    )));
    doc.push(Break::new(1));
    field(doc, "Position", &o.position);
    field(doc, "Department", &o.department);
    field(doc, "Start date", &date(o.start_date));
    optional_field(doc, "End date", o.end_date.map(date).as_deref());
    optional_field(
        doc,
        "Monthly stipend",
        o.stipend.map(|s| format!("INR {s}")).as_deref(),
    );
    doc.push(Break::new(1));
    doc.push(Paragraph::new(
        "Please confirm your acceptance of this offer through your candidate dashboard.",
    ));
}

fn mou_body(doc: &mut Document, m: &CollegeMou) {
    doc.push(Paragraph::new(format!(
        "This Memorandum of Understanding is entered into between {} and {}, {}.",
        COMPANY_NAME, m.college_name, m.college_address
    )));
    doc.push(Break::new(1));
    field(doc, "Purpose", &m.purpose);
    field(doc, "Effective from", &date(m.start_date));
    field(doc, "Valid until", &date(m.end_date));
    doc.push(Break::new(2));
    field(doc, &format!("For {}", m.college_name), &m.college_signatory);
    field(doc, &format!("For {COMPANY_NAME}"), &m.company_signatory);
}

//=========================================================================================
// `DocumentRenderer` Trait Implementation
//=========================================================================================

impl DocumentRenderer for GenPdfRenderer {
    fn render(&self, document: RenderableDocument<'_>, base_url: &str) -> PortResult<Vec<u8>> {
        let reference = document.reference_number();
        let url = document.verification_url(base_url);

        let title = match document {
            RenderableDocument::Certificate(_) => "Certificate",
            RenderableDocument::OfferLetter(_) => "Offer Letter",
            RenderableDocument::Mou(_) => "Memorandum of Understanding",
        };
        let mut doc = self.new_document(&format!("{title} {reference}"))?;
        heading(&mut doc, title, reference);

        match document {
            RenderableDocument::Certificate(c) => certificate_body(&mut doc, c),
            RenderableDocument::OfferLetter(o) => offer_body(&mut doc, o),
            RenderableDocument::Mou(m) => mou_body(&mut doc, m),
        }

        // Keep the temporary PNG alive until rendering finishes.
        let qr = qr_png(&url)?;
        verification_footer(&mut doc, &qr, reference, &url)?;

        let mut out = Vec::new();
        doc.render(&mut out)
            .map_err(|e| PortError::Unexpected(format!("Failed to render PDF: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;
    use veridant_core::domain::NewCertificate;

    const SYSTEM_FONTS: &str = "/usr/share/fonts/truetype/dejavu";

    /// Lays the system DejaVu Sans files out under genpdf's
    /// `{family}-{style}.ttf` naming.
    fn dejavu_family(dir: &Path) -> Option<()> {
        for (source, style) in [
            ("DejaVuSans.ttf", "Regular"),
            ("DejaVuSans-Bold.ttf", "Bold"),
            ("DejaVuSans-Oblique.ttf", "Italic"),
            ("DejaVuSans-BoldOblique.ttf", "BoldItalic"),
        ] {
            std::fs::copy(
                Path::new(SYSTEM_FONTS).join(source),
                dir.join(format!("DejaVuSans-{style}.ttf")),
            )
            .ok()?;
        }
        Some(())
    }

    #[test]
    fn renders_a_certificate_pdf_with_real_fonts() {
        let fonts = tempfile::tempdir().unwrap();
        if dejavu_family(fonts.path()).is_none() {
            eprintln!("skipping: DejaVu Sans not installed under {SYSTEM_FONTS}");
            return;
        }
        let certificate = NewCertificate {
            application_id: None,
            employee_id: None,
            recipient_name: "Asha Rao".to_string(),
            recipient_email: None,
            program_title: "Rust Backend Internship".to_string(),
            certificate_type: "internship_completion".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            valid_until: None,
            grade: Some("A".to_string()),
            mentor_name: None,
            issued_by: None,
        }
        .into_record(
            Uuid::new_v4(),
            "CERT-2026-00001".to_string(),
            "0123456789ABCDEF".to_string(),
            Utc::now(),
        );

        let renderer = GenPdfRenderer::new(fonts.path(), "DejaVuSans");
        let pdf = renderer
            .render(
                RenderableDocument::Certificate(&certificate),
                "https://veridantai.com",
            )
            .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.len() > 1024);
    }

    #[test]
    fn qr_png_is_a_png_file() {
        let tmp = qr_png("https://veridantai.com/verify/0123456789ABCDEF").unwrap();
        let bytes = std::fs::read(tmp.path()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn missing_fonts_are_a_render_error() {
        let renderer = GenPdfRenderer::new("/nonexistent/fonts", "NoSuchFamily");
        match renderer.new_document("x") {
            Err(PortError::Unexpected(msg)) => assert!(msg.contains("NoSuchFamily")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("fonts should not load"),
        }
    }
}
