//! Reference recommendation table: curated Indian music per mood.

use crate::models::{Mood, Track};

const SAMPLE_PREVIEW: &str = "https://www.soundjay.com/misc/sounds/bell-ringing-05.wav";

// (id, title, artist, genre, year, duration)
type Row = (&'static str, &'static str, &'static str, &'static str, &'static str, &'static str);

const HAPPY: [Row; 5] = [
    ("1", "Jai Ho", "A.R. Rahman", "Bollywood", "2008", "5:09"),
    ("2", "Nagada Sang Dhol", "Shreya Ghoshal", "Bollywood", "2013", "4:52"),
    ("3", "Bhangra Paale", "Divine", "Hip-Hop", "2020", "3:24"),
    ("4", "Gallan Goodiyaan", "Yashita Sharma", "Bollywood", "2014", "4:11"),
    ("5", "Kar Gayi Chull", "Neha Kakkar", "Bollywood", "2016", "3:18"),
];

const SAD: [Row; 5] = [
    ("6", "Tum Hi Ho", "Arijit Singh", "Bollywood", "2013", "4:22"),
    ("7", "Ae Dil Hai Mushkil", "Arijit Singh", "Bollywood", "2016", "4:29"),
    ("8", "Humdard", "Arijit Singh", "Bollywood", "2014", "4:58"),
    ("9", "Khone De", "Arijit Singh", "Bollywood", "2015", "4:02"),
    ("10", "Raabta", "Arijit Singh", "Bollywood", "2017", "4:17"),
];

const ANGRY: [Row; 5] = [
    ("11", "Sultan", "Vishal Dadlani", "Bollywood", "2016", "3:24"),
    ("12", "Malhari", "Vishal Dadlani", "Bollywood", "2015", "4:03"),
    ("13", "Apna Time Aayega", "Divine & Ranveer Singh", "Hip-Hop", "2019", "3:07"),
    ("14", "Tattad Tattad", "Arijit Singh", "Bollywood", "2013", "4:16"),
    ("15", "Khalibali", "Shivam Mahadevan", "Bollywood", "2017", "4:28"),
];

const NEUTRAL: [Row; 5] = [
    ("16", "Vande Mataram", "A.R. Rahman", "Patriotic", "1997", "6:52"),
    ("17", "Raga Yaman", "Pt. Ravi Shankar", "Classical", "1995", "8:15"),
    ("18", "Ketto", "Bonobo", "Electronic", "2013", "4:32"),
    ("19", "Mumbai", "A.R. Rahman", "Instrumental", "2009", "5:43"),
    ("20", "Breathe Me", "Prateek Kuhad", "Indie", "2018", "3:56"),
];

const SURPRISED: [Row; 5] = [
    ("21", "Nagada Sang Dhol", "Shreya Ghoshal", "Bollywood", "2013", "4:52"),
    ("22", "Dhoom Machale", "Sunidhi Chauhan", "Bollywood", "2004", "5:27"),
    ("23", "Ainvayi Ainvayi", "Salim-Sulaiman", "Bollywood", "2008", "6:05"),
    ("24", "Bismil", "Arijit Singh", "Bollywood", "2022", "4:31"),
    ("25", "Khairiyat", "Arijit Singh", "Bollywood", "2019", "4:40"),
];

const FEAR: [Row; 5] = [
    ("26", "Om Namah Shivaya", "Krishna Das", "Devotional", "2001", "7:23"),
    ("27", "Hanuman Chalisa", "Hariharan", "Devotional", "2000", "8:12"),
    ("28", "Shiva Moon", "Prem Joshua", "Meditation", "2004", "6:45"),
    ("29", "Gayatri Mantra", "Anuradha Paudwal", "Devotional", "1999", "5:30"),
    ("30", "Mahamrityunjaya Mantra", "Uma Mohan", "Devotional", "1998", "9:15"),
];

/// Search link used when a preview cannot be played.
pub fn external_link(title: &str, artist: &str) -> String {
    let query: String = format!("{title} {artist}")
        .chars()
        .map(|c| match c {
            ' ' => '+',
            '&' => '+',
            c => c,
        })
        .collect();
    format!("https://www.youtube.com/results?search_query={query}")
}

fn build(rows: &[Row]) -> Vec<Track> {
    rows.iter()
        .map(|(id, title, artist, genre, year, duration)| Track {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            genre: genre.to_string(),
            year: year.to_string(),
            duration_label: duration.to_string(),
            preview_uri: Some(SAMPLE_PREVIEW.to_string()),
            external_uri: external_link(title, artist),
        })
        .collect()
}

/// Six mood lists of five tracks each. `Disgusted` deliberately has no list.
pub fn reference_table() -> Vec<(Mood, Vec<Track>)> {
    vec![
        (Mood::Happy, build(&HAPPY)),
        (Mood::Sad, build(&SAD)),
        (Mood::Angry, build(&ANGRY)),
        (Mood::Neutral, build(&NEUTRAL)),
        (Mood::Surprised, build(&SURPRISED)),
        (Mood::Fear, build(&FEAR)),
    ]
}
