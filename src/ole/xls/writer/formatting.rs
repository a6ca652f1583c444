//! XLS cell formatting (FONT, FORMAT, and XF records).
//!
//! This engine only hands integer format handles to the record writers;
//! the registry here owns the tables those handles index into. Every
//! workbook builds its own registry instance — default fonts and formats
//! are constructed per workbook rather than shared as process-wide
//! mutable singletons, so concurrent workbook constructions cannot
//! corrupt each other.

use super::super::XlsResult;
use super::biff::{self, write_record_header};
use crate::ole::writer::ByteSink;
use std::collections::HashMap;

/// Font weight constants
pub const FONT_WEIGHT_NORMAL: u16 = 400;
pub const FONT_WEIGHT_BOLD: u16 = 700;

/// Automatic font color index
pub const COLOR_AUTOMATIC: u16 = 0x7FFF;

/// Built-in number format strings as defined by BIFF8. Indices 0x17-0x24
/// are reserved; custom formats start at
/// [`FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX`].
const BUILTIN_NUMBER_FORMATS: [&str; 50] = [
    "General",                              // 0x00
    "0",                                    // 0x01
    "0.00",                                 // 0x02
    "#,##0",                                // 0x03
    "#,##0.00",                             // 0x04
    "\"$\"#,##0_);(\"$\"#,##0)",            // 0x05
    "\"$\"#,##0_);[Red](\"$\"#,##0)",       // 0x06
    "\"$\"#,##0.00_);(\"$\"#,##0.00)",      // 0x07
    "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)", // 0x08
    "0%",                                   // 0x09
    "0.00%",                                // 0x0A
    "0.00E+00",                             // 0x0B
    "# ?/?",                                // 0x0C
    "# ??/??",                              // 0x0D
    "m/d/yy",                               // 0x0E
    "d-mmm-yy",                             // 0x0F
    "d-mmm",                                // 0x10
    "mmm-yy",                               // 0x11
    "h:mm AM/PM",                           // 0x12
    "h:mm:ss AM/PM",                        // 0x13
    "h:mm",                                 // 0x14
    "h:mm:ss",                              // 0x15
    "m/d/yy h:mm",                          // 0x16
    "reserved-0x17",
    "reserved-0x18",
    "reserved-0x19",
    "reserved-0x1A",
    "reserved-0x1B",
    "reserved-0x1C",
    "reserved-0x1D",
    "reserved-0x1E",
    "reserved-0x1F",
    "reserved-0x20",
    "reserved-0x21",
    "reserved-0x22",
    "reserved-0x23",
    "reserved-0x24",
    "#,##0_);(#,##0)",            // 0x25
    "#,##0_);[Red](#,##0)",       // 0x26
    "#,##0.00_);(#,##0.00)",      // 0x27
    "#,##0.00_);[Red](#,##0.00)", // 0x28
    "_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)",
    "_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)",
    "_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)",
    "_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)",
    "mm:ss",     // 0x2D
    "[h]:mm:ss", // 0x2E
    "mm:ss.0",   // 0x2F
    "##0.0E+0",  // 0x30
    "@",         // 0x31 (text)
];

/// First user-defined number format index in BIFF8.
const FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX: u16 = 164;

/// Largest FORMAT record index the format allows. Registrations past this
/// budget fall back to the default format.
const MAX_FORMAT_RECORD_INDEX: u16 = 441;

fn builtin_number_format_index(pattern: &str) -> Option<u16> {
    BUILTIN_NUMBER_FORMATS
        .iter()
        .position(|&p| p == pattern)
        .map(|idx| idx as u16)
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    #[default]
    General = 0,
    Left = 1,
    Center = 2,
    Right = 3,
    Fill = 4,
    Justify = 5,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    Top = 0,
    Center = 1,
    #[default]
    Bottom = 2,
    Justify = 3,
}

/// Font definition
#[derive(Debug, Clone)]
pub struct Font {
    /// Font height in twips (1/20 of a point)
    pub height: u16,
    /// Font weight (400 = normal, 700 = bold)
    pub weight: u16,
    /// Italic flag
    pub italic: bool,
    /// Underline style (0 = none, 1 = single, 2 = double)
    pub underline: u8,
    /// Font color index
    pub color_index: u16,
    /// Font name
    pub name: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            height: 200, // 10pt
            weight: FONT_WEIGHT_NORMAL,
            italic: false,
            underline: 0,
            color_index: COLOR_AUTOMATIC,
            name: "Arial".to_string(),
        }
    }
}

/// Extended format (XF) descriptor referenced by cells through an index.
#[derive(Debug, Clone, Default)]
pub struct ExtendedFormat {
    /// Font index
    pub font_index: u16,
    /// Number format index
    pub format_index: u16,
    /// Horizontal alignment
    pub h_align: HorizontalAlignment,
    /// Vertical alignment
    pub v_align: VerticalAlignment,
    /// Text wrap
    pub text_wrap: bool,
}

/// Write FONT record (0x0031)
fn write_font<S: ByteSink + ?Sized>(sink: &mut S, font: &Font) -> XlsResult<()> {
    let name_bytes = font.name.as_bytes();
    let name_len = name_bytes.len().min(255);

    // 14 bytes of properties, then name length, options, and name bytes.
    write_record_header(sink, 0x0031, (14 + 1 + 1 + name_len) as u16)?;

    sink.append(&font.height.to_le_bytes())?;

    let mut flags = 0u16;
    if font.italic {
        flags |= 0x0002;
    }
    sink.append(&flags.to_le_bytes())?;

    sink.append(&font.color_index.to_le_bytes())?;
    sink.append(&font.weight.to_le_bytes())?;
    sink.append(&0u16.to_le_bytes())?; // escapement
    sink.append(&[font.underline])?;
    sink.append(&[0, 0, 0])?; // family, charset, reserved

    sink.append(&[name_len as u8, 0x00])?; // length, compressed 8-bit
    sink.append(&name_bytes[..name_len])?;

    Ok(())
}

/// Write XF (Extended Format) record (0x00E0)
fn write_xf<S: ByteSink + ?Sized>(
    sink: &mut S,
    xf: &ExtendedFormat,
    is_style_xf: bool,
) -> XlsResult<()> {
    write_record_header(sink, 0x00E0, 20)?;

    sink.append(&xf.font_index.to_le_bytes())?;
    sink.append(&xf.format_index.to_le_bytes())?;

    // XF type, cell protection, parent style XF
    let xf_type: u16 = if is_style_xf { 0xFFF5 } else { 0x0001 };
    sink.append(&xf_type.to_le_bytes())?;

    let mut align_flags = (xf.h_align as u8) | ((xf.v_align as u8) << 4);
    if xf.text_wrap {
        align_flags |= 0x08;
    }
    sink.append(&[align_flags])?;

    sink.append(&[0, 0, 0])?; // rotation, indent, used-attribute flags
    sink.append(&0u16.to_le_bytes())?; // border styles
    sink.append(&0u16.to_le_bytes())?; // border palette indices
    sink.append(&0u32.to_le_bytes())?; // diagonal and fill pattern
    sink.append(&0u16.to_le_bytes())?; // fill palette indices

    Ok(())
}

/// Registry of fonts, number formats, and cell formats for one workbook.
#[derive(Debug)]
pub struct FormattingManager {
    fonts: Vec<Font>,
    formats: Vec<ExtendedFormat>,
    number_formats: Vec<(u16, String)>,
    number_format_map: HashMap<String, u16>,
}

impl FormattingManager {
    /// Create a registry seeded with the default font and format tables.
    pub fn new() -> Self {
        let mut manager = Self {
            fonts: Vec::new(),
            formats: Vec::new(),
            number_formats: Vec::new(),
            number_format_map: HashMap::new(),
        };

        // Default fonts 0..3: normal, bold, italic, bold italic.
        manager.fonts.push(Font::default());
        manager.fonts.push(Font {
            weight: FONT_WEIGHT_BOLD,
            ..Font::default()
        });
        manager.fonts.push(Font {
            italic: true,
            ..Font::default()
        });
        manager.fonts.push(Font {
            weight: FONT_WEIGHT_BOLD,
            italic: true,
            ..Font::default()
        });

        // Default cell format (index 0)
        manager.formats.push(ExtendedFormat::default());

        manager
    }

    /// Add a font and return its index.
    pub fn add_font(&mut self, font: Font) -> u16 {
        let index = self.fonts.len() as u16;
        self.fonts.push(font);
        index
    }

    /// Add a cell format and return its handle.
    pub fn add_format(&mut self, format: ExtendedFormat) -> u16 {
        let index = self.formats.len() as u16;
        self.formats.push(format);
        index
    }

    pub fn format(&self, index: u16) -> Option<&ExtendedFormat> {
        self.formats.get(index as usize)
    }

    /// Register a number format pattern and return its BIFF format index.
    ///
    /// Built-in patterns return their predefined indices; new patterns
    /// are assigned indices starting at 164 and written as FORMAT
    /// records. Once the record budget is exhausted, further patterns
    /// fall back to the default format with a warning instead of
    /// producing an unreadable file.
    pub fn register_number_format(&mut self, pattern: &str) -> u16 {
        if let Some(index) = builtin_number_format_index(pattern) {
            return index;
        }
        if let Some(&index) = self.number_format_map.get(pattern) {
            return index;
        }

        let next_index = self
            .number_formats
            .last()
            .map(|(code, _)| code + 1)
            .unwrap_or(FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX);
        if next_index > MAX_FORMAT_RECORD_INDEX {
            log::warn!(
                "number format budget exhausted, falling back to General for {:?}",
                pattern
            );
            return 0;
        }

        self.number_formats.push((next_index, pattern.to_string()));
        self.number_format_map
            .insert(pattern.to_string(), next_index);
        next_index
    }

    /// Write all FONT records.
    pub(crate) fn write_fonts<S: ByteSink + ?Sized>(&self, sink: &mut S) -> XlsResult<()> {
        for font in &self.fonts {
            write_font(sink, font)?;
        }
        Ok(())
    }

    /// Write FORMAT records: built-in indices 0..7 plus registered
    /// user-defined formats.
    pub(crate) fn write_number_formats<S: ByteSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> XlsResult<()> {
        for (index, format_str) in BUILTIN_NUMBER_FORMATS.iter().enumerate().take(8) {
            biff::workbook::write_format_record(sink, index as u16, format_str)?;
        }
        for (code, pattern) in &self.number_formats {
            biff::workbook::write_format_record(sink, *code, pattern)?;
        }
        Ok(())
    }

    /// Write the XF table: 15 style XFs, the default cell XF, the built-in
    /// style XFs, then any user-defined cell formats.
    pub(crate) fn write_formats<S: ByteSink + ?Sized>(&self, sink: &mut S) -> XlsResult<()> {
        let base = ExtendedFormat::default();

        for i in 0..15 {
            let mut xf = base.clone();
            xf.font_index = match i {
                1 | 2 => 1,
                3 | 4 => 2,
                _ => 0,
            };
            write_xf(sink, &xf, true)?;
        }

        // Index 15: default cell XF used by unformatted cells
        write_xf(sink, &self.formats[0], false)?;

        // 16..20: style XFs for the built-in comma/currency/percent styles
        const BUILTIN_STYLE_FORMATS: [u16; 5] = [0x002B, 0x0029, 0x002C, 0x002A, 0x0009];
        for &format_index in &BUILTIN_STYLE_FORMATS {
            let mut xf = base.clone();
            xf.format_index = format_index;
            write_xf(sink, &xf, true)?;
        }

        for format in &self.formats[1..] {
            write_xf(sink, format, false)?;
        }

        Ok(())
    }

    /// Map a cell format handle to its XF table index.
    pub(crate) fn cell_xf_index_for(&self, format_handle: u16) -> u16 {
        const STYLE_XF_COUNT: u16 = 15;
        const BUILTIN_STYLE_XF_COUNT: u16 = 5;
        const DEFAULT_CELL_XF_INDEX: u16 = STYLE_XF_COUNT;

        if format_handle == 0 {
            DEFAULT_CELL_XF_INDEX
        } else {
            DEFAULT_CELL_XF_INDEX + 1 + BUILTIN_STYLE_XF_COUNT + (format_handle - 1)
        }
    }
}

impl Default for FormattingManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_patterns_map_to_fixed_indices() {
        let mut manager = FormattingManager::new();
        assert_eq!(manager.register_number_format("General"), 0);
        assert_eq!(manager.register_number_format("0.00"), 2);
        assert_eq!(manager.register_number_format("@"), 0x31);
    }

    #[test]
    fn custom_patterns_start_at_user_range() {
        let mut manager = FormattingManager::new();
        let first = manager.register_number_format("yyyy-mm-dd");
        let second = manager.register_number_format("0.000");
        assert_eq!(first, 164);
        assert_eq!(second, 165);
        // Re-registering returns the existing index
        assert_eq!(manager.register_number_format("yyyy-mm-dd"), 164);
    }

    #[test]
    fn exhausted_budget_falls_back_to_default() {
        let mut manager = FormattingManager::new();
        for i in 0..=(MAX_FORMAT_RECORD_INDEX - FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX) {
            assert_eq!(manager.register_number_format(&format!("fmt-{}", i)), 164 + i);
        }
        assert_eq!(manager.register_number_format("one-too-many"), 0);
    }

    #[test]
    fn xf_index_mapping() {
        let mut manager = FormattingManager::new();
        assert_eq!(manager.cell_xf_index_for(0), 15);
        let handle = manager.add_format(ExtendedFormat {
            font_index: 1,
            ..Default::default()
        });
        assert_eq!(handle, 1);
        assert_eq!(manager.cell_xf_index_for(handle), 21);
    }
}
