//! Program genre classification based on the DVB content descriptor.
//!
//! Backends report a genre as a content nibble pair (ETSI EN 300 468,
//! table 28): the high nibble selects the genre type, the low nibble the
//! subtype. Types 0x1 through 0xB are defined by the standard; everything
//! else (0x0 "undefined", 0xC-0xE reserved, 0xF user defined) is treated
//! as an unknown genre.

use serde::{Deserialize, Serialize};

/// First genre type code inside the standardised range.
pub const GENRE_KNOWN_FIRST: u8 = 0x10;

/// Last genre type code inside the standardised range.
pub const GENRE_KNOWN_LAST: u8 = 0xB0;

/// Genre type classification (high nibble of the content descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenreType {
    /// Undefined content (0x0).
    Undefined = 0x00,
    /// Movie / drama (0x1).
    MovieDrama = 0x10,
    /// News / current affairs (0x2).
    NewsCurrentAffairs = 0x20,
    /// Show / game show (0x3).
    Show = 0x30,
    /// Sports (0x4).
    Sports = 0x40,
    /// Children's / youth programmes (0x5).
    ChildrenYouth = 0x50,
    /// Music / ballet / dance (0x6).
    MusicBalletDance = 0x60,
    /// Arts / culture (without music) (0x7).
    ArtsCulture = 0x70,
    /// Social / political issues / economics (0x8).
    SocialPoliticalEconomics = 0x80,
    /// Education / science / factual topics (0x9).
    EducationalScience = 0x90,
    /// Leisure hobbies (0xA).
    LeisureHobbies = 0xA0,
    /// Special characteristics (0xB).
    Special = 0xB0,
    /// Reserved range (0xC-0xE).
    Reserved = 0xC0,
    /// User defined (0xF).
    UserDefined = 0xF0,
}

impl GenreType {
    /// Classify a genre type code. Only the high nibble is considered.
    pub fn from_code(code: u8) -> Self {
        match code & 0xF0 {
            0x00 => GenreType::Undefined,
            0x10 => GenreType::MovieDrama,
            0x20 => GenreType::NewsCurrentAffairs,
            0x30 => GenreType::Show,
            0x40 => GenreType::Sports,
            0x50 => GenreType::ChildrenYouth,
            0x60 => GenreType::MusicBalletDance,
            0x70 => GenreType::ArtsCulture,
            0x80 => GenreType::SocialPoliticalEconomics,
            0x90 => GenreType::EducationalScience,
            0xA0 => GenreType::LeisureHobbies,
            0xB0 => GenreType::Special,
            0xF0 => GenreType::UserDefined,
            _ => GenreType::Reserved,
        }
    }

    /// Returns true if the genre lies inside the standardised range.
    pub fn is_known(self) -> bool {
        is_known_genre(self as u8)
    }

    /// Get display name in English.
    pub fn display_name(&self) -> &'static str {
        match self {
            GenreType::Undefined => "Undefined",
            GenreType::MovieDrama => "Movie/Drama",
            GenreType::NewsCurrentAffairs => "News/Current Affairs",
            GenreType::Show => "Show/Game Show",
            GenreType::Sports => "Sports",
            GenreType::ChildrenYouth => "Children/Youth",
            GenreType::MusicBalletDance => "Music/Ballet/Dance",
            GenreType::ArtsCulture => "Arts/Culture",
            GenreType::SocialPoliticalEconomics => "Social/Political/Economics",
            GenreType::EducationalScience => "Education/Science",
            GenreType::LeisureHobbies => "Leisure/Hobbies",
            GenreType::Special => "Special",
            GenreType::Reserved => "Reserved",
            GenreType::UserDefined => "User Defined",
        }
    }
}

/// Returns true if a raw genre type code lies inside the standardised range.
///
/// # Example
/// ```
/// use tvguide_types::genre::is_known_genre;
///
/// assert!(is_known_genre(0x40));
/// assert!(!is_known_genre(0x00));
/// assert!(!is_known_genre(0xF0));
/// ```
pub fn is_known_genre(code: u8) -> bool {
    (GENRE_KNOWN_FIRST..=GENRE_KNOWN_LAST).contains(&(code & 0xF0))
}
