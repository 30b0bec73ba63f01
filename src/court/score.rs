use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Number of set slots tracked per match (best of three).
pub const MAX_SETS: usize = 3;
/// Sets needed to win the match.
pub const SETS_TO_WIN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Point {
    Love,
    Fifteen,
    Thirty,
    Forty,
    Advantage,
}

impl Point {
    pub fn label(self) -> &'static str {
        match self {
            Point::Love => "0",
            Point::Fifteen => "15",
            Point::Thirty => "30",
            Point::Forty => "40",
            Point::Advantage => "AD",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "0" => Some(Point::Love),
            "15" => Some(Point::Fifteen),
            "30" => Some(Point::Thirty),
            "40" => Some(Point::Forty),
            "AD" => Some(Point::Advantage),
            _ => None,
        }
    }
}

/// One of the two players on a court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Player slot as sent by a court: `1` or `2`.
    pub fn from_slot(slot: &str) -> Option<Self> {
        match slot.trim() {
            "1" => Some(Side::A),
            "2" => Some(Side::B),
            _ => None,
        }
    }

    pub fn slot(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// What a single point changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOutcome {
    Point,
    Game,
    Set,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("match already finished")]
pub struct MatchFinished;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("expected 4 ':'-separated fields, got {0}")]
    FieldCount(usize),
    #[error("field `{0}` is not a `x/y` pair")]
    Pair(String),
    #[error("unknown point label `{0}`")]
    PointLabel(String),
    #[error("invalid game count `{0}`")]
    GameCount(String),
    #[error("unreachable score: {0}")]
    Unreachable(&'static str),
}

/// Score of one match: points in the current game, games per set, sets won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    points: [Point; 2],
    games: [[u8; MAX_SETS]; 2],
    sets: [u8; 2],
    current_set: usize,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            points: [Point::Love; 2],
            games: [[0; MAX_SETS]; 2],
            sets: [0; 2],
            current_set: 0,
        }
    }
}

/// A set is won at 6 games against at most 4, or at 7.
fn wins_set(games: u8, opponent_games: u8) -> bool {
    (games == 6 && opponent_games <= 4) || games == 7
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self, side: Side) -> Point {
        self.points[side.index()]
    }

    pub fn games(&self, side: Side, set: usize) -> u8 {
        self.games[side.index()][set]
    }

    pub fn sets_won(&self, side: Side) -> u8 {
        self.sets[side.index()]
    }

    pub fn current_set(&self) -> usize {
        self.current_set
    }

    pub fn winner(&self) -> Option<Side> {
        [Side::A, Side::B]
            .into_iter()
            .find(|side| self.sets_won(*side) >= SETS_TO_WIN)
    }

    pub fn is_finished(&self) -> bool {
        self.winner().is_some()
    }

    /// Returns the score after `side` wins a point, leaving `self` untouched.
    pub fn increment(&self, side: Side) -> Result<Score, MatchFinished> {
        let mut next = self.clone();
        next.award_point(side)?;
        Ok(next)
    }

    /// Awards a point to `side` in place.
    pub fn award_point(&mut self, side: Side) -> Result<PointOutcome, MatchFinished> {
        if self.is_finished() {
            return Err(MatchFinished);
        }

        let me = side.index();
        let them = side.opponent().index();

        match (self.points[me], self.points[them]) {
            (Point::Advantage, _) => Ok(self.win_game(side)),
            (Point::Forty, Point::Forty) => {
                self.points[me] = Point::Advantage;
                Ok(PointOutcome::Point)
            }
            (Point::Forty, Point::Advantage) => {
                // Back to deuce.
                self.points[them] = Point::Forty;
                Ok(PointOutcome::Point)
            }
            (Point::Forty, _) => Ok(self.win_game(side)),
            (Point::Love, _) => {
                self.points[me] = Point::Fifteen;
                Ok(PointOutcome::Point)
            }
            (Point::Fifteen, _) => {
                self.points[me] = Point::Thirty;
                Ok(PointOutcome::Point)
            }
            (Point::Thirty, _) => {
                self.points[me] = Point::Forty;
                Ok(PointOutcome::Point)
            }
        }
    }

    fn win_game(&mut self, side: Side) -> PointOutcome {
        let me = side.index();
        let them = side.opponent().index();
        let set = self.current_set;

        self.points = [Point::Love; 2];
        self.games[me][set] += 1;

        if !wins_set(self.games[me][set], self.games[them][set]) {
            return PointOutcome::Game;
        }

        self.sets[me] += 1;
        if self.sets[me] >= SETS_TO_WIN {
            return PointOutcome::Match;
        }
        self.current_set = (self.current_set + 1).min(MAX_SETS - 1);
        PointOutcome::Set
    }

    /// Wire form: `p1/p2:g1/g2:g1/g2:g1/g2`.
    pub fn to_snapshot(&self) -> String {
        let mut out = format!(
            "{}/{}",
            self.points[0].label(),
            self.points[1].label()
        );
        for set in 0..MAX_SETS {
            out.push_str(&format!(":{}/{}", self.games[0][set], self.games[1][set]));
        }
        out
    }

    /// Parses and validates a wire snapshot. Sets won and the current set are
    /// derived from the per-set games.
    pub fn from_snapshot(text: &str) -> Result<Score, SnapshotError> {
        let fields: Vec<&str> = text.trim().split(':').collect();
        if fields.len() != MAX_SETS + 1 {
            return Err(SnapshotError::FieldCount(fields.len()));
        }

        let (pa, pb) = split_pair(fields[0])?;
        let point = |label: &str| {
            Point::from_label(label).ok_or_else(|| SnapshotError::PointLabel(label.to_string()))
        };
        let points = [point(pa)?, point(pb)?];
        match points {
            [Point::Advantage, other] | [other, Point::Advantage] if other != Point::Forty => {
                return Err(SnapshotError::Unreachable("advantage without forty"));
            }
            _ => {}
        }

        let mut score = Score {
            points,
            ..Score::default()
        };

        let mut open_set: Option<usize> = None;
        for (set, field) in fields[1..].iter().enumerate() {
            let (ga, gb) = split_pair(field)?;
            let a = parse_games(ga)?;
            let b = parse_games(gb)?;
            score.games[0][set] = a;
            score.games[1][set] = b;

            if score.is_finished() || open_set.is_some() {
                if a != 0 || b != 0 {
                    return Err(SnapshotError::Unreachable("games after the last played set"));
                }
                continue;
            }

            match (wins_set(a, b), wins_set(b, a)) {
                (true, false) if a == 6 || b >= 5 => score.sets[0] += 1,
                (false, true) if b == 6 || a >= 5 => score.sets[1] += 1,
                (false, false) if a <= 6 && b <= 6 => {
                    open_set = Some(set);
                }
                _ => return Err(SnapshotError::Unreachable("impossible set result")),
            }
        }

        if score.is_finished() {
            if score.points != [Point::Love; 2] {
                return Err(SnapshotError::Unreachable("points after the match ended"));
            }
            score.current_set = (score.sets[0] + score.sets[1] - 1) as usize;
        } else {
            score.current_set = open_set.unwrap_or(MAX_SETS - 1);
        }
        Ok(score)
    }
}

fn split_pair(field: &str) -> Result<(&str, &str), SnapshotError> {
    field
        .split_once('/')
        .ok_or_else(|| SnapshotError::Pair(field.to_string()))
}

fn parse_games(text: &str) -> Result<u8, SnapshotError> {
    text.parse::<u8>()
        .ok()
        .filter(|games| *games <= 7)
        .ok_or_else(|| SnapshotError::GameCount(text.to_string()))
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_snapshot())
    }
}
