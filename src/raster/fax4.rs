// ITU-T T.6 (CCITT Group 4) 二値画像の符号化

use super::{ConvertedImage, EncodedImage, FaxParams, ImageFilter, MonoImage, PdfColorSpace};
use crate::error::HocrPdfError;

// 白ラン終端符号 (0-63)
const WHITE_TERMINATING: [&str; 64] = [
    "00110101", "000111", "0111", "1000", "1011", "1100", "1110", "1111", "10011", "10100",
    "00111", "01000", "001000", "000011", "110100", "110101", "101010", "101011", "0100111",
    "0001100", "0001000", "0010111", "0000011", "0000100", "0101000", "0101011", "0010011",
    "0100100", "0011000", "00000010", "00000011", "00011010", "00011011", "00010010",
    "00010011", "00010100", "00010101", "00010110", "00010111", "00101000", "00101001",
    "00101010", "00101011", "00101100", "00101101", "00000100", "00000101", "00001010",
    "00001011", "01010010", "01010011", "01010100", "01010101", "00100100", "00100101",
    "01011000", "01011001", "01011010", "01011011", "01001010", "01001011", "00110010",
    "00110011", "00110100",
];

// 黒ラン終端符号 (0-63)
const BLACK_TERMINATING: [&str; 64] = [
    "0000110111", "010", "11", "10", "011", "0011", "0010", "00011", "000101", "000100",
    "0000100", "0000101", "0000111", "00000100", "00000111", "000011000", "0000010111",
    "0000011000", "0000001000", "00001100111", "00001101000", "00001101100", "00000110111",
    "00000101000", "00000010111", "00000011000", "000011001010", "000011001011",
    "000011001100", "000011001101", "000001101000", "000001101001", "000001101010",
    "000001101011", "000011010010", "000011010011", "000011010100", "000011010101",
    "000011010110", "000011010111", "000001101100", "000001101101", "000011011010",
    "000011011011", "000001010100", "000001010101", "000001010110", "000001010111",
    "000001100100", "000001100101", "000001010010", "000001010011", "000000100100",
    "000000110111", "000000111000", "000000100111", "000000101000", "000001011000",
    "000001011001", "000000101011", "000000101100", "000001011010", "000001100110",
    "000001100111",
];

// 白メイクアップ符号 (64, 128, ..., 1728)
const WHITE_MAKEUP: [&str; 27] = [
    "11011", "10010", "010111", "0110111", "00110110", "00110111", "01100100", "01100101",
    "01101000", "01100111", "011001100", "011001101", "011010010", "011010011", "011010100",
    "011010101", "011010110", "011010111", "011011000", "011011001", "011011010", "011011011",
    "010011000", "010011001", "010011010", "011000", "010011011",
];

// 黒メイクアップ符号 (64, 128, ..., 1728)
const BLACK_MAKEUP: [&str; 27] = [
    "0000001111", "000011001000", "000011001001", "000001011011", "000000110011",
    "000000110100", "000000110101", "0000001101100", "0000001101101", "0000001001010",
    "0000001001011", "0000001001100", "0000001001101", "0000001110010", "0000001110011",
    "0000001110100", "0000001110101", "0000001110110", "0000001110111", "0000001010010",
    "0000001010011", "0000001010100", "0000001010101", "0000001011010", "0000001011011",
    "0000001100100", "0000001100101",
];

// 白黒共通の拡張メイクアップ符号 (1792, 1856, ..., 2560)
const EXTENDED_MAKEUP: [&str; 13] = [
    "00000001000", "00000001100", "00000001101", "000000010010", "000000010011",
    "000000010100", "000000010101", "000000010110", "000000010111", "000000011100",
    "000000011101", "000000011110", "000000011111",
];

const MODE_PASS: &str = "0001";
const MODE_HORIZONTAL: &str = "001";
/// 垂直モード符号。インデックスは a1 - b1 + 3。
const MODE_VERTICAL: [&str; 7] = [
    "0000010", "000010", "010", "1", "011", "000011", "0000011",
];
const EOL: &str = "000000000001";

const MAX_MAKEUP: usize = 2560;

/// Mono1画像をCCITTFaxDecode (K = -1) の画像ストリームに符号化する。
pub fn encode_fax4(image: &ConvertedImage) -> crate::error::Result<EncodedImage> {
    let ConvertedImage::Mono1(mono) = image else {
        return Err(HocrPdfError::encode(
            "Fax4 compression requires a 1-bit image",
        ));
    };

    let data = encode_g4(mono)?;

    Ok(EncodedImage {
        data,
        width: mono.width(),
        height: mono.height(),
        bits_per_component: 1,
        color_space: PdfColorSpace::DeviceGray,
        filter: ImageFilter::CcittFax,
        decode_parms: Some(FaxParams {
            k: -1,
            columns: mono.width(),
            rows: mono.height(),
        }),
    })
}

/// パック済みの1bit行バッファ（ビット1 = 黒）を符号化する。
pub fn encode_g4_packed(data: &[u8], width: u32, height: u32) -> crate::error::Result<Vec<u8>> {
    let mono = MonoImage::from_raw(width, height, data.to_vec())?;
    encode_g4(&mono)
}

/// 純2次元符号化でG4ストリームを生成し、末尾にEOFBを付ける。
pub fn encode_g4(image: &MonoImage) -> crate::error::Result<Vec<u8>> {
    let width = image.width() as usize;
    let height = image.height();
    if width == 0 || height == 0 {
        return Err(HocrPdfError::encode(format!(
            "cannot Fax4-encode an empty image ({}x{height})",
            image.width()
        )));
    }

    let mut writer = BitWriter::new();
    let mut reference = vec![false; width];

    for y in 0..height {
        let coding = image.row_bits(y);
        encode_row(&mut writer, &reference, &coding);
        reference = coding;
    }

    // EOFB = EOL + EOL
    writer.push_code(EOL);
    writer.push_code(EOL);
    Ok(writer.finish())
}

fn encode_row(writer: &mut BitWriter, reference: &[bool], coding: &[bool]) {
    let width = coding.len();
    // a0 = None は行頭の仮想白画素
    let mut a0: Option<usize> = None;
    let mut color = false;

    loop {
        let start = a0.map_or(0, |p| p + 1);
        let a1 = find_color(coding, start, !color);
        let b1 = find_b1(reference, a0, color);
        let b2 = find_color(reference, b1 + 1, color);

        if b2 < a1 {
            writer.push_code(MODE_PASS);
            a0 = Some(b2);
        } else if a1.abs_diff(b1) <= 3 {
            let index = (a1 as isize - b1 as isize + 3) as usize;
            writer.push_code(MODE_VERTICAL[index]);
            a0 = Some(a1);
            color = !color;
        } else {
            let a2 = find_color(coding, a1 + 1, color);
            let run_start = a0.unwrap_or(0);
            writer.push_code(MODE_HORIZONTAL);
            write_run(writer, a1 - run_start, color);
            write_run(writer, a2 - a1, !color);
            a0 = Some(a2);
        }

        if a0.is_some_and(|p| p >= width) {
            break;
        }
    }
}

/// `start` 以降で色が `color` である最初の位置。無ければ行幅を返す。
fn find_color(line: &[bool], start: usize, color: bool) -> usize {
    if start >= line.len() {
        return line.len();
    }
    line[start..]
        .iter()
        .position(|&px| px == color)
        .map_or(line.len(), |offset| start + offset)
}

/// a0より右にあり、a0の色と反対色の参照行変化点 b1 を求める。
fn find_b1(reference: &[bool], a0: Option<usize>, color: bool) -> usize {
    let width = reference.len();
    let mut p = a0.map_or(0, |p| p + 1);
    loop {
        p = find_color(reference, p, !color);
        if p >= width {
            return width;
        }
        // 直前画素がa0の色なら変化点
        if p == 0 || reference[p - 1] == color {
            return p;
        }
        p = find_color(reference, p, color);
    }
}

fn write_run(writer: &mut BitWriter, mut run: usize, black: bool) {
    let (terminating, makeup) = if black {
        (&BLACK_TERMINATING, &BLACK_MAKEUP)
    } else {
        (&WHITE_TERMINATING, &WHITE_MAKEUP)
    };

    while run >= MAX_MAKEUP + 64 {
        writer.push_code(EXTENDED_MAKEUP[EXTENDED_MAKEUP.len() - 1]);
        run -= MAX_MAKEUP;
    }
    if run >= 64 {
        let chunk = run / 64;
        if chunk <= makeup.len() {
            writer.push_code(makeup[chunk - 1]);
        } else {
            writer.push_code(EXTENDED_MAKEUP[chunk - makeup.len() - 1]);
        }
        run %= 64;
    }
    writer.push_code(terminating[run]);
}

/// MSBから詰めるビットライタ
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            current: 0,
            filled: 0,
        }
    }

    fn push_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | u8::from(bit);
        self.filled += 1;
        if self.filled == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    fn push_code(&mut self, code: &str) {
        for c in code.bytes() {
            self.push_bit(c == b'1');
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.bytes.push(self.current << (8 - self.filled));
        }
        self.bytes
    }
}
