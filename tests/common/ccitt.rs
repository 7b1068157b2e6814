//! CCITT G4 (T.6) デコーダ。
//!
//! 出力検証用。符号表と参照行の探索はエンコーダと共有しない。
//! 画素は 1 = 白, 0 = 黒 で保持する。

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Pass,
    Horizontal,
    Vertical(i32),
    Eofb,
}

const MODE_CODES: &[(Mode, &str)] = &[
    (Mode::Vertical(0), "1"),
    (Mode::Vertical(1), "011"),
    (Mode::Vertical(-1), "010"),
    (Mode::Horizontal, "001"),
    (Mode::Pass, "0001"),
    (Mode::Vertical(2), "000011"),
    (Mode::Vertical(-2), "000010"),
    (Mode::Vertical(3), "0000011"),
    (Mode::Vertical(-3), "0000010"),
    (Mode::Eofb, "000000000001000000000001"),
];

const WHITE_CODES: &[(usize, &str)] = &[
    (0, "00110101"), (1, "000111"), (2, "0111"), (3, "1000"), (4, "1011"), (5, "1100"),
    (6, "1110"), (7, "1111"), (8, "10011"), (9, "10100"), (10, "00111"), (11, "01000"),
    (12, "001000"), (13, "000011"), (14, "110100"), (15, "110101"), (16, "101010"),
    (17, "101011"), (18, "0100111"), (19, "0001100"), (20, "0001000"), (21, "0010111"),
    (22, "0000011"), (23, "0000100"), (24, "0101000"), (25, "0101011"), (26, "0010011"),
    (27, "0100100"), (28, "0011000"), (29, "00000010"), (30, "00000011"), (31, "00011010"),
    (32, "00011011"), (33, "00010010"), (34, "00010011"), (35, "00010100"), (36, "00010101"),
    (37, "00010110"), (38, "00010111"), (39, "00101000"), (40, "00101001"), (41, "00101010"),
    (42, "00101011"), (43, "00101100"), (44, "00101101"), (45, "00000100"), (46, "00000101"),
    (47, "00001010"), (48, "00001011"), (49, "01010010"), (50, "01010011"), (51, "01010100"),
    (52, "01010101"), (53, "00100100"), (54, "00100101"), (55, "01011000"), (56, "01011001"),
    (57, "01011010"), (58, "01011011"), (59, "01001010"), (60, "01001011"), (61, "00110010"),
    (62, "00110011"), (63, "00110100"),
    (64, "11011"), (128, "10010"), (192, "010111"), (256, "0110111"), (320, "00110110"),
    (384, "00110111"), (448, "01100100"), (512, "01100101"), (576, "01101000"),
    (640, "01100111"), (704, "011001100"), (768, "011001101"), (832, "011010010"),
    (896, "011010011"), (960, "011010100"), (1024, "011010101"), (1088, "011010110"),
    (1152, "011010111"), (1216, "011011000"), (1280, "011011001"), (1344, "011011010"),
    (1408, "011011011"), (1472, "010011000"), (1536, "010011001"), (1600, "010011010"),
    (1664, "011000"), (1728, "010011011"),
];

const BLACK_CODES: &[(usize, &str)] = &[
    (0, "0000110111"), (1, "010"), (2, "11"), (3, "10"), (4, "011"), (5, "0011"),
    (6, "0010"), (7, "00011"), (8, "000101"), (9, "000100"), (10, "0000100"),
    (11, "0000101"), (12, "0000111"), (13, "00000100"), (14, "00000111"), (15, "000011000"),
    (16, "0000010111"), (17, "0000011000"), (18, "0000001000"), (19, "00001100111"),
    (20, "00001101000"), (21, "00001101100"), (22, "00000110111"), (23, "00000101000"),
    (24, "00000010111"), (25, "00000011000"), (26, "000011001010"), (27, "000011001011"),
    (28, "000011001100"), (29, "000011001101"), (30, "000001101000"), (31, "000001101001"),
    (32, "000001101010"), (33, "000001101011"), (34, "000011010010"), (35, "000011010011"),
    (36, "000011010100"), (37, "000011010101"), (38, "000011010110"), (39, "000011010111"),
    (40, "000001101100"), (41, "000001101101"), (42, "000011011010"), (43, "000011011011"),
    (44, "000001010100"), (45, "000001010101"), (46, "000001010110"), (47, "000001010111"),
    (48, "000001100100"), (49, "000001100101"), (50, "000001010010"), (51, "000001010011"),
    (52, "000000100100"), (53, "000000110111"), (54, "000000111000"), (55, "000000100111"),
    (56, "000000101000"), (57, "000001011000"), (58, "000001011001"), (59, "000000101011"),
    (60, "000000101100"), (61, "000001011010"), (62, "000001100110"), (63, "000001100111"),
    (64, "0000001111"), (128, "000011001000"), (192, "000011001001"), (256, "000001011011"),
    (320, "000000110011"), (384, "000000110100"), (448, "000000110101"),
    (512, "0000001101100"), (576, "0000001101101"), (640, "0000001001010"),
    (704, "0000001001011"), (768, "0000001001100"), (832, "0000001001101"),
    (896, "0000001110010"), (960, "0000001110011"), (1024, "0000001110100"),
    (1088, "0000001110101"), (1152, "0000001110110"), (1216, "0000001110111"),
    (1280, "0000001010010"), (1344, "0000001010011"), (1408, "0000001010100"),
    (1472, "0000001010101"), (1536, "0000001011010"), (1600, "0000001011011"),
    (1664, "0000001100100"), (1728, "0000001100101"),
];

/// 白黒共通の拡張メイクアップ符号
const EXTENDED_CODES: &[(usize, &str)] = &[
    (1792, "00000001000"), (1856, "00000001100"), (1920, "00000001101"),
    (1984, "000000010010"), (2048, "000000010011"), (2112, "000000010100"),
    (2176, "000000010101"), (2240, "000000010110"), (2304, "000000010111"),
    (2368, "000000011100"), (2432, "000000011101"), (2496, "000000011110"),
    (2560, "000000011111"),
];

/// 符号語の二分木。ノード0が根。
struct HuffTree<T: Copy> {
    children: Vec<[Option<usize>; 2]>,
    leaves: Vec<Option<T>>,
}

impl<T: Copy> HuffTree<T> {
    fn build<'a>(codes: impl IntoIterator<Item = &'a (T, &'a str)>) -> Self
    where
        T: 'a,
    {
        let mut tree = Self {
            children: vec![[None, None]],
            leaves: vec![None],
        };
        for &(value, bits) in codes {
            let mut node = 0;
            for c in bits.bytes() {
                let branch = usize::from(c == b'1');
                node = match tree.children[node][branch] {
                    Some(next) => next,
                    None => {
                        tree.children.push([None, None]);
                        tree.leaves.push(None);
                        let next = tree.children.len() - 1;
                        tree.children[node][branch] = Some(next);
                        next
                    }
                };
            }
            tree.leaves[node] = Some(value);
        }
        tree
    }
}

struct Bits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Bits<'_> {
    fn next_bit(&mut self) -> Option<usize> {
        let byte = *self.data.get(self.pos / 8)?;
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Some(usize::from(bit))
    }

    fn read<T: Copy>(&mut self, tree: &HuffTree<T>) -> Option<T> {
        let mut node = 0;
        loop {
            node = tree.children[node][self.next_bit()?]?;
            if let Some(value) = tree.leaves[node] {
                return Some(value);
            }
        }
    }

    /// メイクアップ符号を終端符号まで合算する。
    fn read_run(&mut self, tree: &HuffTree<usize>) -> Option<usize> {
        let mut total = 0;
        loop {
            let run = self.read(tree)?;
            total += run;
            if run < 64 {
                return Some(total);
            }
        }
    }
}

/// 1行分の復号状態
struct LineState {
    width: usize,
    refline: Vec<i8>,
    curline: Vec<i8>,
    curpos: isize,
    color: i8,
}

impl LineState {
    fn new(width: usize) -> Self {
        Self {
            width,
            refline: vec![1; width],
            curline: vec![1; width],
            curpos: -1,
            color: 1,
        }
    }

    fn next_line(&mut self) -> Vec<i8> {
        let done = std::mem::replace(&mut self.curline, vec![1; self.width]);
        self.refline = done.clone();
        self.curpos = -1;
        self.color = 1;
        done
    }

    /// a0より右で、a0と反対色に変わる参照行の位置 (b1)
    fn b1(&self) -> usize {
        let mut x = (self.curpos + 1) as usize;
        loop {
            if x == 0 {
                if self.color == 1 && self.refline[0] != self.color {
                    return 0;
                }
            } else if x >= self.width
                || (self.refline[x - 1] == self.color && self.refline[x] != self.color)
            {
                return x;
            }
            x += 1;
        }
    }

    /// b1 の次の変化点 (b2)
    fn b2(&self, b1: usize) -> usize {
        let mut x = b1;
        loop {
            if x == 0 {
                if self.color == 0 && self.refline[0] == self.color {
                    return 0;
                }
            } else if x >= self.width
                || (self.refline[x - 1] != self.color && self.refline[x] == self.color)
            {
                return x;
            }
            x += 1;
        }
    }

    fn fill(&mut self, from: usize, to: usize, color: i8) {
        let to = to.min(self.width);
        if from < to {
            self.curline[from..to].fill(color);
        }
    }

    fn vertical(&mut self, dx: i32) -> Option<()> {
        let a1 = usize::try_from(self.b1() as i64 + i64::from(dx)).ok()?;
        let a1 = a1.min(self.width);
        let a0 = self.curpos.max(0) as usize;
        self.fill(a0, a1, self.color);
        self.curpos = a1 as isize;
        self.color = 1 - self.color;
        Some(())
    }

    fn pass(&mut self) {
        let b2 = self.b2(self.b1());
        let a0 = self.curpos.max(0) as usize;
        self.fill(a0, b2, self.color);
        self.curpos = b2 as isize;
    }

    fn horizontal(&mut self, first: usize, second: usize) {
        let a0 = self.curpos.max(0) as usize;
        self.fill(a0, a0 + first, self.color);
        self.fill(a0 + first, a0 + first + second, 1 - self.color);
        self.curpos = (a0 + first + second) as isize;
    }
}

/// G4ストリームを復号し、各行を bool 列（true = 黒）で返す。
///
/// 符号が壊れている、または行数が足りなければ `None`。
pub fn decode_g4(data: &[u8], width: usize, height: usize) -> Option<Vec<Vec<bool>>> {
    let modes = HuffTree::build(MODE_CODES);
    let white = HuffTree::build(WHITE_CODES.iter().chain(EXTENDED_CODES));
    let black = HuffTree::build(BLACK_CODES.iter().chain(EXTENDED_CODES));

    let mut bits = Bits { data, pos: 0 };
    let mut state = LineState::new(width);
    let mut rows = Vec::with_capacity(height);

    while rows.len() < height {
        match bits.read(&modes)? {
            Mode::Pass => state.pass(),
            Mode::Vertical(dx) => state.vertical(dx)?,
            Mode::Horizontal => {
                let (first_tree, second_tree) = if state.color == 1 {
                    (&white, &black)
                } else {
                    (&black, &white)
                };
                let first = bits.read_run(first_tree)?;
                let second = bits.read_run(second_tree)?;
                state.horizontal(first, second);
            }
            Mode::Eofb => return None,
        }
        if state.curpos >= width as isize {
            let line = state.next_line();
            rows.push(line.iter().map(|&px| px == 0).collect());
        }
    }

    // 全行の後には EOFB が続く
    match bits.read(&modes) {
        Some(Mode::Eofb) => Some(rows),
        _ => None,
    }
}
