//! Chapter-mark parsing for admin-supplied timestamp lists.
//!
//! Accepted line shapes: `mm:ss title` and `hh:mm:ss title`, where the first
//! component is one or two digits and the rest are exactly two. Lines that do
//! not match are dropped silently; zero surviving lines is a valid result,
//! reported distinctly by the caller's confirmation message.

use greenroom_store::ChapterMark;

/// Parses free text into chapter marks sorted ascending by offset.
pub fn parse_chapter_marks(text: &str) -> Vec<ChapterMark> {
    let mut marks: Vec<ChapterMark> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_chapter_line)
        .collect();
    marks.sort_by_key(|mark| mark.offset_seconds);
    marks
}

fn parse_chapter_line(line: &str) -> Option<ChapterMark> {
    let (stamp, title) = line.split_once(|ch: char| ch.is_whitespace())?;
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    let components: Vec<&str> = stamp.split(':').collect();
    let offset_seconds = match components.as_slice() {
        [minutes, seconds] => {
            leading_component(minutes)? * 60 + fixed_two_digits(seconds)?
        }
        [hours, minutes, seconds] => {
            leading_component(hours)? * 3_600
                + fixed_two_digits(minutes)? * 60
                + fixed_two_digits(seconds)?
        }
        _ => return None,
    };
    Some(ChapterMark {
        offset_seconds,
        title: title.to_string(),
    })
}

fn leading_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn fixed_two_digits(raw: &str) -> Option<u32> {
    if raw.len() != 2 || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functional_parses_minute_second_lines_in_order() {
        let marks = parse_chapter_marks("00:00 Intro\n01:12 Verse\n02:05 Chorus");
        assert_eq!(marks.len(), 3);
        assert_eq!(marks[0], ChapterMark { offset_seconds: 0, title: "Intro".to_string() });
        assert_eq!(marks[1], ChapterMark { offset_seconds: 72, title: "Verse".to_string() });
        assert_eq!(marks[2], ChapterMark { offset_seconds: 125, title: "Chorus".to_string() });
    }

    #[test]
    fn functional_supports_hour_stamps_and_sorts_ascending() {
        let marks = parse_chapter_marks("1:02:03 Finale\n0:35 Opening");
        assert_eq!(marks[0].offset_seconds, 35);
        assert_eq!(marks[0].title, "Opening");
        assert_eq!(marks[1].offset_seconds, 3_723);
        assert_eq!(marks[1].title, "Finale");
    }

    #[test]
    fn unit_non_matching_lines_are_dropped_not_errors() {
        let marks = parse_chapter_marks("hello there\n\n  \n1:5 too short\n99 no colon");
        assert!(marks.is_empty());
    }

    #[test]
    fn unit_title_is_required() {
        assert!(parse_chapter_marks("01:00").is_empty());
        assert!(parse_chapter_marks("01:00    ").is_empty());
    }

    #[test]
    fn regression_parser_is_idempotent_over_its_own_rendering() {
        let marks = parse_chapter_marks("02:05 Chorus\n00:00 Intro\n01:12 Verse");
        let rendered: String = marks
            .iter()
            .map(|mark| {
                format!(
                    "{:02}:{:02} {}\n",
                    mark.offset_seconds / 60,
                    mark.offset_seconds % 60,
                    mark.title
                )
            })
            .collect();
        assert_eq!(parse_chapter_marks(&rendered), marks);
    }

    #[test]
    fn regression_mixed_valid_and_invalid_lines_keep_the_valid_ones() {
        let marks = parse_chapter_marks("intro first\n00:10 Ten\nbroken 1:2:3:4\n00:05 Five");
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].offset_seconds, 5);
        assert_eq!(marks[1].offset_seconds, 10);
    }
}
