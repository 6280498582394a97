use crate::error::ExtractionError;
use crate::extractor::pack_subtitle;
use crate::models::Document;

#[derive(Debug, Clone, Copy)]
pub struct SampleSubtitle {
    pub id: i64,
    pub name: &'static str,
    pub lines: [&'static str; 5],
}

impl SampleSubtitle {
    /// Renders the lines as a five-entry SRT file, one five-second cue each.
    pub fn srt(&self) -> String {
        let mut text = String::new();
        for (index, line) in self.lines.iter().enumerate() {
            let start = if index == 0 { 10 } else { 9 + 7 * index };
            let end = start + 5;
            if index > 0 {
                text.push('\n');
            }
            text.push_str(&format!(
                "{}\n00:00:{start:02},000 --> 00:00:{end:02},000\n{line}\n",
                index + 1
            ));
        }
        text
    }

    pub fn to_document(&self) -> Result<Document, ExtractionError> {
        Ok(Document {
            id: self.id,
            name: self.name.to_string(),
            raw_content: pack_subtitle(&format!("{}.srt", self.name), &self.srt())?,
        })
    }
}

pub fn sample_subtitles() -> Vec<SampleSubtitle> {
    vec![
        SampleSubtitle {
            id: 1001,
            name: "The Shawshank Redemption (1994)",
            lines: [
                "I believe in two things: discipline and the Bible.",
                "Here you'll receive both. Put your trust in the Lord.",
                "Your ass belongs to me. Welcome to Shawshank.",
                "Get busy living or get busy dying. That's goddamn right.",
                "I have to remind myself that some birds aren't meant to be caged.",
            ],
        },
        SampleSubtitle {
            id: 1002,
            name: "The Godfather (1972)",
            lines: [
                "I'm gonna make him an offer he can't refuse.",
                "It's not personal, Sonny. It's strictly business.",
                "Leave the gun. Take the cannoli.",
                "A man who doesn't spend time with his family can never be a real man.",
                "Great men are not born great, they grow great.",
            ],
        },
        SampleSubtitle {
            id: 1003,
            name: "The Dark Knight (2008)",
            lines: [
                "Why so serious?",
                "Some men just want to watch the world burn.",
                "You either die a hero or live long enough to see yourself become the villain.",
                "The night is darkest just before the dawn.",
                "This city just showed you that it's full of people ready to believe in good.",
            ],
        },
        SampleSubtitle {
            id: 1004,
            name: "Pulp Fiction (1994)",
            lines: [
                "Royale with cheese.",
                "Say what again. Say what again, I dare you, I double-dare you.",
                "The path of the righteous man is beset on all sides by the inequities of the selfish.",
                "Zed's dead, baby. Zed's dead.",
                "I'm not a hero. I'm not a bad guy. I'm just an old man who's been in the business a long time.",
            ],
        },
        SampleSubtitle {
            id: 1005,
            name: "Forrest Gump (1994)",
            lines: [
                "Life is like a box of chocolates. You never know what you're gonna get.",
                "Stupid is as stupid does.",
                "Run, Forrest, run!",
                "That's all I have to say about that.",
                "My mama always said, life was like a box of chocolates.",
            ],
        },
    ]
}

pub fn sample_documents() -> Result<Vec<Document>, ExtractionError> {
    sample_subtitles()
        .iter()
        .map(SampleSubtitle::to_document)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_subtitle_text;
    use crate::keyword::find_matches;

    #[test]
    fn srt_rendering_uses_subtitle_layout() {
        let srt = sample_subtitles()[3].srt();
        assert!(srt.starts_with("1\n00:00:10,000 --> 00:00:15,000\nRoyale with cheese.\n\n2\n00:00:16,000 --> 00:00:21,000\n"));
        assert!(srt.contains("5\n00:00:37,000 --> 00:00:42,000\nI'm not a hero."));
    }

    #[test]
    fn sample_documents_extract_to_their_srt() {
        let documents = sample_documents().unwrap();
        assert_eq!(documents.len(), 5);
        assert_eq!(documents[4].id, 1005);

        let text = extract_subtitle_text(&documents[4].raw_content).unwrap();
        assert_eq!(find_matches(&text, "chocolates", false).len(), 2);
    }
}
