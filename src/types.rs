use std::collections::BTreeSet;
use std::fmt::Display;

use imageproc::rect::Rect;
use serde::{de, Deserialize, Serialize};

/// Axis-aligned bounds of one candidate bubble, in mask-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width over height. Zero-height boxes have no meaningful ratio.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }

    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    /// Converts to an `imageproc` rect for drawing, or `None` for a
    /// degenerate box.
    pub fn to_rect(&self) -> Option<Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(Rect::at(self.x as i32, self.y as i32).of_size(self.width, self.height))
    }
}

/// What the test-taker marked for one question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Answer {
    NoAnswer,
    /// 0-based choice index.
    SingleChoice(usize),
    MultipleChoice(BTreeSet<usize>),
}

impl Answer {
    pub fn is_answered(&self) -> bool {
        !matches!(self, Answer::NoAnswer)
    }

    /// Builds the canonical answer for a set of marked choices: none is
    /// `NoAnswer`, one is `SingleChoice`, more is `MultipleChoice`.
    pub fn from_choices(indices: BTreeSet<usize>) -> Self {
        if indices.len() > 1 {
            Answer::MultipleChoice(indices)
        } else {
            indices
                .first()
                .map_or(Answer::NoAnswer, |&index| Answer::SingleChoice(index))
        }
    }
}

fn choice_letter(index: usize) -> String {
    if index < 26 {
        char::from(b'a' + index as u8).to_string()
    } else {
        index.to_string()
    }
}

impl Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::NoAnswer => write!(f, "-"),
            Answer::SingleChoice(index) => write!(f, "{}", choice_letter(*index)),
            Answer::MultipleChoice(indices) => {
                let letters = indices
                    .iter()
                    .map(|index| choice_letter(*index))
                    .collect::<Vec<_>>();
                write!(f, "{}", letters.join(","))
            }
        }
    }
}

// Answers travel as `-1`, `2` or `[0, 1]`, which is also how answer keys are
// written by hand.
impl Serialize for Answer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Answer::NoAnswer => serializer.serialize_i64(-1),
            Answer::SingleChoice(index) => serializer.serialize_u64(*index as u64),
            Answer::MultipleChoice(indices) => serializer.collect_seq(indices.iter()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Index(i64),
    Indices(Vec<usize>),
    Letters(String),
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RawAnswer::deserialize(deserializer)? {
            RawAnswer::Index(index) if index < 0 => Ok(Answer::NoAnswer),
            RawAnswer::Index(index) => Ok(Answer::SingleChoice(index as usize)),
            RawAnswer::Indices(indices) => Ok(Answer::from_choices(indices.into_iter().collect())),
            RawAnswer::Letters(letters) => letters.parse().map_err(de::Error::custom),
        }
    }
}

impl std::str::FromStr for Answer {
    type Err = String;

    /// Parses letter notation: `""` or `"-"` is unanswered, `"c"` is a
    /// single choice, `"ab"` (separators `,`, `.` and spaces allowed) is a
    /// multiple choice.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut indices = BTreeSet::new();
        for c in s.trim().chars() {
            match c.to_ascii_lowercase() {
                letter @ 'a'..='z' => {
                    indices.insert((letter as u8 - b'a') as usize);
                }
                ',' | '.' | ' ' | '-' => {}
                _ => return Err(format!("invalid answer {:?}", s)),
            }
        }

        Ok(Answer::from_choices(indices))
    }
}
