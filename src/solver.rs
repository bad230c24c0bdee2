//! Exact-cover Sudoku solver (dancing links).
//!
//! Each candidate placement "digit k in cell (r, c)" is a row covering four
//! constraint columns: the cell is filled, row r has k, column c has k, and
//! the box holds k. A solution picks 81 rows covering every column once.

use crate::models::{Digit, SudokuGrid};

const N: usize = SudokuGrid::SIZE;
const CONSTRAINTS: usize = 4 * N * N;
const CANDIDATES: usize = N * N * N;
const ROOT: usize = 0;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: usize,
    right: usize,
    up: usize,
    down: usize,
    /// Header node of this node's column
    column: usize,
    /// Candidate placement, unused for headers
    candidate: usize,
}

/// Toroidal doubly linked matrix stored in one arena.
/// Node 0 is the root, nodes `1..=CONSTRAINTS` are column headers.
struct DancingLinks {
    nodes: Vec<Node>,
    sizes: Vec<usize>,
    /// First node of every candidate row
    row_heads: Vec<usize>,
}

fn candidate_id(row: usize, col: usize, digit: usize) -> usize {
    row * N * N + col * N + (digit - 1)
}

/// Columns covered by placing `digit` at (`row`, `col`)
fn constraint_columns(row: usize, col: usize, digit: usize) -> [usize; 4] {
    let k = digit - 1;
    let boxed = (row / 3) * 3 + col / 3;
    [
        row * N + col,
        N * N + row * N + k,
        2 * N * N + col * N + k,
        3 * N * N + boxed * N + k,
    ]
}

impl DancingLinks {
    fn new() -> Self {
        let mut links = Self {
            nodes: Vec::with_capacity(1 + CONSTRAINTS + 4 * CANDIDATES),
            sizes: vec![0; 1 + CONSTRAINTS],
            row_heads: vec![0; CANDIDATES],
        };

        links.nodes.push(Node { left: 0, right: 0, up: 0, down: 0, column: 0, candidate: 0 });
        for header in 1..=CONSTRAINTS {
            let left = links.nodes[ROOT].left;
            links.nodes.push(Node { left, right: ROOT, up: header, down: header, column: header, candidate: 0 });
            links.nodes[left].right = header;
            links.nodes[ROOT].left = header;
        }

        for row in 0..N {
            for col in 0..N {
                for digit in 1..=N {
                    links.add_row(candidate_id(row, col, digit), constraint_columns(row, col, digit));
                }
            }
        }

        links
    }

    fn add_row(&mut self, candidate: usize, columns: [usize; 4]) {
        let first = self.nodes.len();
        for (i, column) in columns.into_iter().enumerate() {
            let header = column + 1;
            let id = first + i;
            let up = self.nodes[header].up;
            self.nodes.push(Node {
                left: first + (i + 3) % 4,
                right: first + (i + 1) % 4,
                up,
                down: header,
                column: header,
                candidate,
            });
            self.nodes[up].down = id;
            self.nodes[header].up = id;
            self.sizes[header] += 1;
        }
        self.row_heads[candidate] = first;
    }

    fn cover(&mut self, header: usize) {
        let Node { left, right, .. } = self.nodes[header];
        self.nodes[left].right = right;
        self.nodes[right].left = left;

        let mut i = self.nodes[header].down;
        while i != header {
            let mut j = self.nodes[i].right;
            while j != i {
                let Node { up, down, column, .. } = self.nodes[j];
                self.nodes[up].down = down;
                self.nodes[down].up = up;
                self.sizes[column] -= 1;
                j = self.nodes[j].right;
            }
            i = self.nodes[i].down;
        }
    }

    fn uncover(&mut self, header: usize) {
        let mut i = self.nodes[header].up;
        while i != header {
            let mut j = self.nodes[i].left;
            while j != i {
                let Node { up, down, column, .. } = self.nodes[j];
                self.sizes[column] += 1;
                self.nodes[up].down = j;
                self.nodes[down].up = j;
                j = self.nodes[j].left;
            }
            i = self.nodes[i].up;
        }

        let Node { left, right, .. } = self.nodes[header];
        self.nodes[left].right = header;
        self.nodes[right].left = header;
    }

    /// Column with the fewest remaining rows, `None` once all are covered
    fn choose_column(&self) -> Option<usize> {
        let mut best = None;
        let mut best_size = usize::MAX;
        let mut c = self.nodes[ROOT].right;
        while c != ROOT {
            if self.sizes[c] < best_size {
                best_size = self.sizes[c];
                best = Some(c);
            }
            c = self.nodes[c].right;
        }
        best
    }

    /// Select a whole candidate row up front, as for a given clue
    fn select(&mut self, candidate: usize) {
        let head = self.row_heads[candidate];
        self.cover(self.nodes[head].column);
        let mut j = self.nodes[head].right;
        while j != head {
            self.cover(self.nodes[j].column);
            j = self.nodes[j].right;
        }
    }

    fn search(&mut self, solution: &mut Vec<usize>) -> bool {
        let Some(header) = self.choose_column() else {
            return true;
        };
        if self.sizes[header] == 0 {
            return false;
        }

        self.cover(header);
        let mut r = self.nodes[header].down;
        while r != header {
            solution.push(self.nodes[r].candidate);
            let mut j = self.nodes[r].right;
            while j != r {
                self.cover(self.nodes[j].column);
                j = self.nodes[j].right;
            }

            if self.search(solution) {
                return true;
            }

            solution.pop();
            let mut j = self.nodes[r].left;
            while j != r {
                self.uncover(self.nodes[j].column);
                j = self.nodes[j].left;
            }
            r = self.nodes[r].down;
        }
        self.uncover(header);

        false
    }
}

/// Fill every empty cell of `puzzle`.
///
/// Returns `None` when the clues contradict each other or admit no solution.
/// When several solutions exist the first one found is returned.
pub fn solve(puzzle: &SudokuGrid) -> Option<SudokuGrid> {
    let mut links = DancingLinks::new();
    let mut covered = [false; CONSTRAINTS];
    let mut solution = Vec::with_capacity(N * N);

    for row in 0..N {
        for col in 0..N {
            let Digit::Value(digit) = puzzle.digit(row, col) else {
                continue;
            };
            let digit = digit as usize;

            let columns = constraint_columns(row, col, digit);
            if columns.iter().any(|&c| covered[c]) {
                return None;
            }
            for c in columns {
                covered[c] = true;
            }

            let candidate = candidate_id(row, col, digit);
            links.select(candidate);
            solution.push(candidate);
        }
    }

    if !links.search(&mut solution) {
        return None;
    }

    let mut solved = SudokuGrid::empty();
    for candidate in solution {
        let row = candidate / (N * N);
        let col = (candidate / N) % N;
        let digit = (candidate % N + 1) as u8;
        solved.set(row, col, Digit::Value(digit));
    }
    Some(solved)
}

fn all_distinct_digits(cells: impl Iterator<Item = u8>) -> bool {
    let mut seen = [false; N + 1];
    for v in cells {
        let v = v as usize;
        if v == 0 || v > N || seen[v] {
            return false;
        }
        seen[v] = true;
    }
    true
}

/// True when every row, column and box holds each digit 1-9 exactly once
pub fn is_solved(grid: &SudokuGrid) -> bool {
    (0..N).all(|i| {
        all_distinct_digits((0..N).map(|j| grid.get(i, j)))
            && all_distinct_digits((0..N).map(|j| grid.get(j, i)))
            && all_distinct_digits((0..N).map(|j| grid.get((i / 3) * 3 + j / 3, (i % 3) * 3 + j % 3)))
    })
}
