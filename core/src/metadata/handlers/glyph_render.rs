//! Shared ASCII-grid → SVG renderer for the two on-chain generative art
//! handlers (Autoglyphs, Colorglyphs). Both contracts store their art as a
//! grid of symbols returned straight out of `tokenURI`/`uri` rather than a
//! JSON document pointing at an off-chain image.

use base64::Engine;

pub const CANVAS_SIZE: f64 = 240.0;
pub const CELL_STRIDE: f64 = 3.0;
pub const GRID_OFFSET: f64 = 21.0;

/// Splits a raw grid payload into rows of symbols, dropping blank lines.
pub fn parse_grid(raw: &str) -> Vec<Vec<char>> {
    raw.lines().map(|line| line.trim_end().chars().collect::<Vec<char>>()).filter(|row| !row.is_empty()).collect()
}

/// Renders `grid` onto a `CANVAS_SIZE`x`CANVAS_SIZE` SVG, one shape per cell
/// whose `color_for` callback returns `Some`; symbols it returns `None` for
/// are left as background.
pub fn render_svg(grid: &[Vec<char>], background: &str, color_for: impl Fn(char) -> Option<String>) -> String {
    let mut body = String::new();
    for (row, cells) in grid.iter().enumerate() {
        for (col, &symbol) in cells.iter().enumerate() {
            let Some(color) = color_for(symbol) else { continue };
            let x = GRID_OFFSET + col as f64 * CELL_STRIDE;
            let y = GRID_OFFSET + row as f64 * CELL_STRIDE;
            body.push_str(&shape_for(symbol, x, y, &color));
        }
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\"><rect width=\"{size}\" height=\"{size}\" fill=\"{background}\"/>{body}</svg>",
        size = CANVAS_SIZE,
    )
}

fn shape_for(symbol: char, x: f64, y: f64, color: &str) -> String {
    let s = CELL_STRIDE;
    let x2 = x + s;
    let y2 = y + s;
    let cx = x + s / 2.0;
    let cy = y + s / 2.0;
    match symbol {
        '-' => format!("<line x1=\"{x}\" y1=\"{cy}\" x2=\"{x2}\" y2=\"{cy}\" stroke=\"{color}\"/>"),
        '|' => format!("<line x1=\"{cx}\" y1=\"{y}\" x2=\"{cx}\" y2=\"{y2}\" stroke=\"{color}\"/>"),
        '/' => format!("<line x1=\"{x}\" y1=\"{y2}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"{color}\"/>"),
        '\\' => format!("<line x1=\"{x}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y2}\" stroke=\"{color}\"/>"),
        'X' => format!(
            "<line x1=\"{x}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y2}\" stroke=\"{color}\"/><line x1=\"{x}\" y1=\"{y2}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"{color}\"/>"
        ),
        '+' => format!(
            "<line x1=\"{cx}\" y1=\"{y}\" x2=\"{cx}\" y2=\"{y2}\" stroke=\"{color}\"/><line x1=\"{x}\" y1=\"{cy}\" x2=\"{x2}\" y2=\"{cy}\" stroke=\"{color}\"/>"
        ),
        'O' => format!("<circle cx=\"{cx}\" cy=\"{cy}\" r=\"{r}\" fill=\"{color}\"/>", r = s / 2.5),
        _ => format!("<circle cx=\"{cx}\" cy=\"{cy}\" r=\"{r}\" fill=\"{color}\"/>", r = s / 6.0),
    }
}

pub fn to_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", base64::engine::general_purpose::STANDARD.encode(svg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_blank_lines() {
        let grid = parse_grid("X+\n\n.|\n");
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn renders_a_shape_per_non_background_cell() {
        let grid = parse_grid("X.\n");
        let svg = render_svg(&grid, "#000000", |c| if c == '.' { None } else { Some("#fff".to_string()) });
        assert_eq!(svg.matches("<line").count() + svg.matches("<circle").count(), 2);
    }

    #[test]
    fn wraps_svg_in_a_data_uri() {
        let uri = to_data_uri("<svg/>");
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
    }
}
