use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use anyhow::{Result, bail};

use crate::sgf::coords::{
    MAX_SIZE, adjacent_points, is_star_point, parse_point, parse_point_list, point, valid_point,
};

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// The occupancy state of a single intersection, and also the identity of
/// a player (where `Empty` means "no player").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colour {
    Empty,
    Black,
    White,
}

impl Colour {
    /// Black↔White; `Empty` maps to itself.
    pub fn opposite(self) -> Colour {
        match self {
            Colour::Black => Colour::White,
            Colour::White => Colour::Black,
            Colour::Empty => Colour::Empty,
        }
    }

    /// The SGF move key for the colour: `"B"`, `"W"`, or `"?"`.
    pub fn short_name(self) -> &'static str {
        match self {
            Colour::Empty => "?",
            Colour::Black => "B",
            Colour::White => "W",
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A Go position: stone grid, side to move, simple-ko marker, and the
/// cumulative prisoner count for each colour.
///
/// Boards handed out by the tree (`GameTree::board`) are copies; editing
/// one never affects the node it came from. There is no invariant that the
/// grid is *legal* — setup edits (`add_stone`, `add_list`) can leave groups
/// without liberties, which is what the SGF `AB`/`AW`/`AE` properties call
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub size: usize,
    pub player: Colour,
    pub ko: Option<String>,
    state: Vec<Colour>,
    captures: [usize; 2],
}

impl Board {
    /// An empty board with Black to move. Sizes outside 1..=52 are a
    /// programming error.
    pub fn new(size: usize) -> Board {
        assert!(
            (1..=MAX_SIZE).contains(&size),
            "Board::new(): bad size {size}"
        );
        Board {
            size,
            player: Colour::Black,
            ko: None,
            state: vec![Colour::Empty; size * size],
            captures: [0, 0],
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        x * self.size + y
    }

    /// The colour at the given point; `Empty` for off-board strings.
    pub fn get(&self, p: &str) -> Colour {
        match parse_point(p, self.size) {
            Some((x, y)) => self.state[self.index(x, y)],
            None => Colour::Empty,
        }
    }

    /// Overwrite a cell. No side effects at all: no captures, no ko or
    /// player update. Off-board points are silently ignored.
    pub fn set(&mut self, p: &str, colour: Colour) {
        if let Some((x, y)) = parse_point(p, self.size) {
            let i = self.index(x, y);
            self.state[i] = colour;
        }
    }

    /// Stones taken *by* the given colour on this board.
    pub fn captures_by(&self, colour: Colour) -> usize {
        match colour {
            Colour::Black => self.captures[0],
            Colour::White => self.captures[1],
            Colour::Empty => 0,
        }
    }

    fn captures_mut(&mut self, colour: Colour) -> &mut usize {
        match colour {
            Colour::Black => &mut self.captures[0],
            Colour::White => &mut self.captures[1],
            Colour::Empty => unreachable!("captures_mut(): no colour"),
        }
    }

    pub fn has_ko(&self) -> bool {
        self.ko.is_some()
    }

    pub fn set_ko(&mut self, p: &str) {
        self.ko = if valid_point(p, self.size) {
            Some(p.to_string())
        } else {
            None
        };
    }

    pub fn clear_ko(&mut self) {
        self.ko = None;
    }

    // -- setup edits --------------------------------------------------------

    /// Adjust the board the way the SGF setup properties `AB`/`AW`/`AE` do:
    /// set the cell without performing captures, clear any ko, and (for a
    /// real colour) make the opposite colour the next player.
    pub fn add_stone(&mut self, p: &str, colour: Colour) {
        self.set(p, colour);
        self.clear_ko();
        if colour != Colour::Empty {
            self.player = colour.opposite();
        }
    }

    /// Like [`add_stone`](Board::add_stone) for an SGF points rectangle
    /// such as `"dd:fg"`.
    pub fn add_list(&mut self, s: &str, colour: Colour) {
        for p in parse_point_list(s, self.size) {
            self.set(&p, colour);
        }
        self.clear_ko();
        if colour != Colour::Empty {
            self.player = colour.opposite();
        }
    }

    // -- move edits ---------------------------------------------------------

    /// Adjust the board the way the SGF move properties `B`/`W` do: place
    /// the stone, remove captured enemy groups, remove the placed group if
    /// the move was suicidal, and maintain the ko marker and next player.
    ///
    /// There is no legality check — ko recaptures succeed, as does playing
    /// on an occupied point. An off-board point string is a pass. `Empty`
    /// is a programming error.
    pub fn force_stone(&mut self, p: &str, colour: Colour) {
        assert!(colour != Colour::Empty, "Board::force_stone(): no colour");

        self.clear_ko();

        if !valid_point(p, self.size) {
            // a pass
            self.player = colour.opposite();
            return;
        }

        self.set(p, colour);

        let opponent = colour.opposite();
        let mut caps = 0;

        for a in adjacent_points(p, self.size) {
            if self.get(&a) == opponent && !self.has_liberties(&a) {
                caps += self.destroy_group(&a);
            }
        }
        *self.captures_mut(colour) += caps;

        if !self.has_liberties(p) {
            let suicide_caps = self.destroy_group(p);
            *self.captures_mut(opponent) += suicide_caps;
        }

        // A single capture by a lone stone with a lone liberty is a ko.
        if caps == 1 && self.singleton(p) && self.liberties(p).len() == 1 {
            let ko = self.ko_square(p);
            self.set_ko(&ko);
        }

        self.player = colour.opposite();
    }

    // The unique empty neighbour of the capturing stone; only called once
    // the ko conditions are known to hold.
    fn ko_square(&self, p: &str) -> String {
        let mut hits: Vec<String> = adjacent_points(p, self.size)
            .into_iter()
            .filter(|a| self.get(a) == Colour::Empty)
            .collect();
        assert!(hits.len() == 1, "Board::ko_square(): got {} hits", hits.len());
        hits.pop().unwrap()
    }

    /// Check whether the given colour may play at the given point. `Ok(())`
    /// means legal; the error explains the refusal.
    pub fn legal(&self, p: &str) -> Result<()> {
        self.legal_colour(p, self.player)
    }

    pub fn legal_colour(&self, p: &str, colour: Colour) -> Result<()> {
        if colour == Colour::Empty {
            bail!("colour not Black or White");
        }
        if !valid_point(p, self.size) {
            bail!("invalid or off-board point {:?}", p);
        }
        if self.get(p) != Colour::Empty {
            bail!("point {:?} not empty", p);
        }
        if self.ko.as_deref() == Some(p) && colour == self.player {
            // Only the player the ko is aimed at is barred; forcing the
            // other colour through here bypasses it.
            bail!("ko recapture forbidden");
        }

        let neighbours = adjacent_points(p, self.size);
        if neighbours.iter().any(|a| self.get(a) == Colour::Empty) {
            return Ok(());
        }
        for a in &neighbours {
            let c = self.get(a);
            if c == colour.opposite() && self.liberties(a).len() == 1 {
                return Ok(()); // the move captures
            }
            if c == colour && self.liberties(a).len() >= 2 {
                return Ok(()); // the move connects to safety
            }
        }
        bail!("suicide forbidden")
    }

    /// Legality-checked play; the colour is the board's next player.
    pub fn play(&mut self, p: &str) -> Result<()> {
        self.play_colour(p, self.player)
    }

    pub fn play_colour(&mut self, p: &str, colour: Colour) -> Result<()> {
        self.legal_colour(p, colour)?;
        self.force_stone(p, colour);
        Ok(())
    }

    /// Clear any ko and hand the turn to the other player.
    pub fn pass(&mut self) {
        self.clear_ko();
        self.player = self.player.opposite();
    }

    // -- group analysis -----------------------------------------------------

    /// Every point of the connected same-colour group containing `p`;
    /// empty for an empty or off-board seed.
    pub fn stones(&self, p: &str) -> Vec<String> {
        let colour = self.get(p);
        if colour == Colour::Empty {
            return Vec::new();
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![p.to_string()];
        while let Some(q) = stack.pop() {
            if !seen.insert(q.clone()) {
                continue;
            }
            for a in adjacent_points(&q, self.size) {
                if self.get(&a) == colour && !seen.contains(&a) {
                    stack.push(a);
                }
            }
        }
        let mut ret: Vec<String> = seen.into_iter().collect();
        ret.sort();
        ret
    }

    /// Whether the group containing `p` has at least one liberty. False
    /// for an empty or off-board seed. Cheaper than counting them all.
    pub fn has_liberties(&self, p: &str) -> bool {
        let colour = self.get(p);
        if colour == Colour::Empty {
            return false;
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![p.to_string()];
        while let Some(q) = stack.pop() {
            if !seen.insert(q.clone()) {
                continue;
            }
            for a in adjacent_points(&q, self.size) {
                match self.get(&a) {
                    Colour::Empty => return true,
                    c if c == colour => {
                        if !seen.contains(&a) {
                            stack.push(a);
                        }
                    }
                    _ => {}
                }
            }
        }
        false
    }

    /// The unique empty points adjacent to the group containing `p`;
    /// empty for an empty or off-board seed.
    pub fn liberties(&self, p: &str) -> Vec<String> {
        let mut libs: HashSet<String> = HashSet::new();
        for stone in self.stones(p) {
            for a in adjacent_points(&stone, self.size) {
                if self.get(&a) == Colour::Empty {
                    libs.insert(a);
                }
            }
        }
        let mut ret: Vec<String> = libs.into_iter().collect();
        ret.sort();
        ret
    }

    /// Whether no neighbour of `p` shares its colour.
    pub fn singleton(&self, p: &str) -> bool {
        let colour = self.get(p);
        adjacent_points(p, self.size)
            .iter()
            .all(|a| self.get(a) != colour)
    }

    /// Clear every cell of the group containing `p`, returning how many
    /// stones were removed. Capture counters are untouched — that is the
    /// caller's job. An empty or off-board seed removes nothing.
    pub fn destroy_group(&mut self, p: &str) -> usize {
        let colour = self.get(p);
        if colour == Colour::Empty {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![p.to_string()];
        while let Some(q) = stack.pop() {
            if self.get(&q) != colour {
                continue;
            }
            self.set(&q, Colour::Empty);
            count += 1;
            stack.extend(adjacent_points(&q, self.size));
        }
        count
    }

    // -- rendering ----------------------------------------------------------

    /// An ASCII diagram, two characters per cell and one row per line:
    /// `X` Black, `O` White, `:` the ko square, `hoshi` an empty star
    /// point, `.` anything else.
    pub fn diagram(&self, hoshi: char) -> String {
        let ko = self.ko.as_deref().and_then(|k| parse_point(k, self.size));
        let mut out = String::new();
        for y in 0..self.size {
            for x in 0..self.size {
                let glyph = match self.state[self.index(x, y)] {
                    Colour::Black => 'X',
                    Colour::White => 'O',
                    Colour::Empty if ko == Some((x, y)) => ':',
                    Colour::Empty if is_star_point(&point(x, y), self.size) => hoshi,
                    Colour::Empty => '.',
                };
                out.push(' ');
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagram('.'))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
