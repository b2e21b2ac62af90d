// src/utils/palette.rs
use std::fs;
use std::io;
use std::path::Path;

/// One colour-table entry; index is the line position in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub index: usize,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Parses `<Entry c1="r" c2="g" c3="b" c4="a"/>` lines. Blank lines are skipped,
    /// a missing alpha is opaque.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| PaletteEntry {
                index,
                r: component(line, "c1").unwrap_or(0),
                g: component(line, "c2").unwrap_or(0),
                b: component(line, "c3").unwrap_or(0),
                a: component(line, "c4").unwrap_or(255),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn component(line: &str, key: &str) -> Option<u8> {
    let pattern = format!("{key}=\"");
    let start = line.find(&pattern)? + pattern.len();
    let end = line[start..].find('"')? + start;
    line[start..end].trim().parse::<u8>().ok()
}
