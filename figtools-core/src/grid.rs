//! Image Grid - Several Exports in One HTML Table

use crate::display::MIME_PNG;
use crate::exporter::{ExportError, ExportOutput};

/// Lay out exported figures `n_columns` per row, each image `width` px wide
///
/// Every cell holds the embedded PNG above its hash-stamped link. The last
/// row is left short when the outputs don't fill it.
pub fn img_grid(outputs: &[ExportOutput], n_columns: usize, width: u32) -> Result<String, ExportError> {
    if n_columns == 0 {
        return Err(ExportError::InvalidGrid("n_columns must be at least 1".into()));
    }

    let cells = outputs
        .iter()
        .map(|out| -> Result<String, ExportError> {
            let encoded = out.image.encoded()?;
            Ok([
                format!(r#"<img src="data:{};base64,{}" width={}px />"#, MIME_PNG, encoded, width),
                out.link.to_html(),
            ]
            .join("<br/>"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let body: String = cells
        .chunks(n_columns)
        .map(|row| {
            let tds: String = row
                .iter()
                .map(|cell| format!(r#"<td style="text-align:center">{}</td>"#, cell))
                .collect();
            format!("<tr>{}</tr>", tds)
        })
        .collect();

    Ok(format!("<table>{}</table>", body))
}
