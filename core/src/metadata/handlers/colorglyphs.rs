//! Colorglyphs layers a palette derived from the token's creator address
//! onto an underlying Autoglyph. `tokenURI`/`uri` returns the grid, scheme
//! id, and creator address packed together (`grid;;schemeId;;creator`, `;;`
//! chosen because it can't appear inside the grid's symbol alphabet, unlike
//! the space the grid itself uses for empty cells).
//!
//! The creator address is split into 35 six-hex-digit colors, cycling
//! through its hex digits if it's shorter than the 210 hex digits that would
//! cover all 35 without repetition (every real 20-byte address is). Each of
//! the ten schemes below picks a subset of those colors, ranked by one of
//! six linear combinations of R/G/B, and a background (spec.md GLOSSARY).

use std::collections::BTreeMap;

use indexer_types::value::Value;

use super::glyph_render::{parse_grid, render_svg, to_data_uri};
use super::CustomHandler;

pub const CONTRACT_ADDRESS: &str = "0x60f3680350f65beb2752788cb48abfce84a4759e";

const TOTAL_COLORS: usize = 35;
const SEPARATOR: &str = ";;";

pub struct ColorglyphsHandler;

impl CustomHandler for ColorglyphsHandler {
    fn contract_address(&self) -> &'static str {
        CONTRACT_ADDRESS
    }

    fn generate(&self, token_id: &str, uri: &str) -> BTreeMap<String, Value> {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), Value::String(format!("Colorglyph #{token_id}")));

        let Some((grid_text, scheme_id, creator_address)) = parse_uri(uri) else {
            return metadata;
        };

        let colors = derive_colors(&creator_address);
        let ranked = Rankings::of(&colors);
        let palette = scheme_palette(scheme_id, &ranked);

        let grid = parse_grid(&grid_text);
        if !grid.is_empty() {
            let svg = render_svg(&grid, &palette.background, |symbol| palette.foreground_for(symbol));
            metadata.insert("image".to_string(), Value::String(to_data_uri(&svg)));
        }

        metadata.insert("scheme".to_string(), Value::Num(scheme_id as f64));
        metadata.insert(
            "colors".to_string(),
            Value::Array(palette.colors.iter().map(|c| Value::String(format!("#{c}"))).collect()),
        );
        metadata
    }
}

fn parse_uri(uri: &str) -> Option<(String, u8, String)> {
    let mut parts = uri.rsplitn(3, SEPARATOR);
    let creator = parts.next()?.trim().to_string();
    let scheme = parts.next()?.trim().parse().ok()?;
    let grid = parts.next()?.to_string();
    Some((grid, scheme, creator))
}

fn derive_colors(creator_address: &str) -> Vec<String> {
    let hex: Vec<char> = creator_address.trim_start_matches("0x").trim_start_matches("0X").chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let hex = if hex.is_empty() { vec!['0'] } else { hex };
    (0..TOTAL_COLORS).map(|i| (0..6).map(|j| hex[(i * 6 + j) % hex.len()]).collect::<String>()).collect()
}

struct Rankings {
    lightest: Vec<String>,
    reddest: Vec<String>,
    orangest: Vec<String>,
    yellowest: Vec<String>,
    greenest: Vec<String>,
    bluest: Vec<String>,
}

impl Rankings {
    fn of(colors: &[String]) -> Self {
        let by = |score: fn((i32, i32, i32)) -> i32| {
            let mut ranked = colors.to_vec();
            ranked.sort_by_key(|c| std::cmp::Reverse(score(rgb(c))));
            ranked
        };
        Self {
            lightest: by(|(r, g, b)| r + g + b),
            reddest: by(|(r, g, b)| r - g - b),
            orangest: by(|(r, g, b)| r - b),
            yellowest: by(|(r, g, b)| r + g - b),
            greenest: by(|(r, g, b)| g - r - b),
            bluest: by(|(r, g, b)| b - r - g),
        }
    }
}

fn rgb(color: &str) -> (i32, i32, i32) {
    let channel = |offset: usize| i32::from_str_radix(&color[offset..offset + 2], 16).unwrap_or(0);
    (channel(0), channel(2), channel(4))
}

struct Palette {
    colors: Vec<String>,
    background: String,
}

impl Palette {
    fn new(colors: Vec<String>, background: &str) -> Self {
        Self { colors, background: background.to_string() }
    }

    fn foreground_for(&self, symbol: char) -> Option<String> {
        if symbol.is_whitespace() || self.colors.is_empty() {
            return None;
        }
        let index = (symbol as usize) % self.colors.len();
        Some(format!("#{}", self.colors[index]))
    }
}

fn pick(ranked: &[String], index: usize) -> String {
    ranked.get(index).cloned().unwrap_or_else(|| "808080".to_string())
}

/// The ten named schemes from the GLOSSARY's color-scheme table.
fn scheme_palette(scheme_id: u8, r: &Rankings) -> Palette {
    let darkest = r.lightest.last().cloned().unwrap_or_else(|| "000000".to_string());
    match scheme_id {
        1 => Palette::new(vec![pick(&r.lightest, 0), pick(&r.lightest, 2), pick(&r.lightest, 4)], "#000000"),
        2 => Palette::new(r.lightest.iter().take(4).cloned().collect(), "#000000"),
        3 => Palette::new(vec![pick(&r.reddest, 0), pick(&r.orangest, 0), pick(&r.yellowest, 0)], "#000000"),
        4 => Palette::new(vec![pick(&r.reddest, 0), pick(&r.yellowest, 0), pick(&r.greenest, 0), "ffffff".to_string()], "#000000"),
        5 => Palette::new(
            vec![pick(&r.lightest, 0), pick(&r.reddest, 0), pick(&r.yellowest, 0), pick(&r.greenest, 0), pick(&r.bluest, 0)],
            "#000000",
        ),
        6 => Palette::new(vec![pick(&r.reddest, 0), "ffffff".to_string()], "#000000"),
        7 => Palette::new(vec![pick(&r.greenest, 0)], "#000000"),
        8 => Palette::new(vec![pick(&r.lightest, 0)], &format!("#{darkest}")),
        9 => Palette::new(vec![pick(&r.greenest, 0)], &format!("#{}", pick(&r.reddest, 0))),
        10 => Palette::new(
            vec![pick(&r.reddest, 0), pick(&r.yellowest, 0), pick(&r.bluest, 0), pick(&r.lightest, 0), "000000".to_string()],
            "#ffffff",
        ),
        _ => Palette::new(vec![pick(&r.lightest, 0)], "#000000"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(grid: &str, scheme: u8, creator: &str) -> String {
        format!("{grid}{SEPARATOR}{scheme}{SEPARATOR}{creator}")
    }

    #[test]
    fn derives_exactly_35_colors_cycling_a_short_address() {
        let colors = derive_colors("0xabc123");
        assert_eq!(colors.len(), TOTAL_COLORS);
        assert!(colors.iter().all(|c| c.len() == 6 && c.chars().all(|ch| ch.is_ascii_hexdigit())));
    }

    #[test]
    fn lightest_ranking_puts_white_first() {
        let colors = vec!["ffffff".to_string(), "000000".to_string(), "808080".to_string()];
        let ranked = Rankings::of(&colors);
        assert_eq!(ranked.lightest.first().unwrap(), "ffffff");
        assert_eq!(ranked.lightest.last().unwrap(), "000000");
    }

    #[test]
    fn scheme_one_selects_three_lightest_shades_on_black() {
        let handler = ColorglyphsHandler;
        let metadata = handler.generate("5", &uri("X.\n", 1, "0xabc123def4567890abc123def4567890abc123d"));
        match metadata.get("colors") {
            Some(Value::Array(colors)) => assert_eq!(colors.len(), 3),
            other => panic!("expected a 3-color array, got {other:?}"),
        }
        assert!(metadata.get("image").is_some());
    }

    #[test]
    fn scheme_ten_selects_five_colors_on_white_background() {
        let handler = ColorglyphsHandler;
        let metadata = handler.generate("5", &uri("X.\n", 10, "0xabc123def4567890abc123def4567890abc123d"));
        match metadata.get("colors") {
            Some(Value::Array(colors)) => assert_eq!(colors.len(), 5),
            other => panic!("expected a 5-color array, got {other:?}"),
        }
    }

    #[test]
    fn malformed_uri_still_returns_the_name() {
        let handler = ColorglyphsHandler;
        let metadata = handler.generate("5", "not a colorglyph uri");
        assert!(metadata.get("name").is_some());
        assert!(metadata.get("colors").is_none());
    }
}
