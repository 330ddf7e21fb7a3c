//! Condition-tag extraction over the feature vector.
//!
//! Threshold rules turn a feature vector into a small set of named match
//! conditions ("away_favorite", "sharp_money", ...). ROI tracking keeps an
//! independent aggregate per tag; the pattern learner keys on the sorted,
//! "&"-joined compound of all tags.

use crate::features::MatchFeatures;

/// Named conditions detected for this match, sorted alphabetically.
pub fn extract_condition_tags(f: &MatchFeatures) -> Vec<String> {
    let mut tags = Vec::new();

    if f.home_injury_count > 8.0 {
        tags.push("home_injury_crisis");
    }
    if f.away_injury_count > 8.0 {
        tags.push("away_injury_crisis");
    }
    if f.home_injury_count + f.away_injury_count > 12.0 {
        tags.push("high_total_injuries");
    }

    // Positive gap = away ranked higher up the table.
    if f.table_position_gap > 5.0 {
        tags.push("away_favorite");
    } else if f.table_position_gap < -5.0 {
        tags.push("home_strong_favorite");
    }

    if f.home_win_rate < 30.0 {
        tags.push("home_poor_form");
    } else if f.home_win_rate > 70.0 {
        tags.push("home_hot_form");
    }

    if f.elite_vs_underdog_flag > 0.0 {
        tags.push("elite_vs_underdog");
    }
    if f.class_mismatch > 2.0 {
        tags.push("class_mismatch");
    }
    if f.sharp_money_flag > 0.0 {
        tags.push("sharp_money");
    }
    if f.xg_underperformance_flag > 0.0 {
        tags.push("xg_underperformance");
    }
    if f.derby_flag > 0.0 {
        tags.push("derby_match");
    }

    let mut tags: Vec<String> = tags.into_iter().map(String::from).collect();
    tags.sort_unstable();
    tags
}

/// Compound key for the pattern learner: sorted tags joined with "&".
/// Empty tag sets map to "no_conditions" so the aggregate still has a key.
pub fn compound_key(tags: &[String]) -> String {
    if tags.is_empty() {
        "no_conditions".to_string()
    } else {
        tags.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_match_has_no_tags() {
        let tags = extract_condition_tags(&MatchFeatures::default());
        assert!(tags.is_empty(), "defaults should trip no thresholds: {tags:?}");
        assert_eq!(compound_key(&tags), "no_conditions");
    }

    #[test]
    fn injury_thresholds() {
        let mut f = MatchFeatures::default();
        f.home_injury_count = 9.0;
        f.away_injury_count = 4.0;
        let tags = extract_condition_tags(&f);
        assert!(tags.contains(&"home_injury_crisis".to_string()));
        assert!(tags.contains(&"high_total_injuries".to_string()));
        assert!(!tags.contains(&"away_injury_crisis".to_string()));
    }

    #[test]
    fn position_gap_picks_one_side() {
        let mut f = MatchFeatures::default();
        f.table_position_gap = 6.0;
        assert!(extract_condition_tags(&f).contains(&"away_favorite".to_string()));
        f.table_position_gap = -6.0;
        let tags = extract_condition_tags(&f);
        assert!(tags.contains(&"home_strong_favorite".to_string()));
        assert!(!tags.contains(&"away_favorite".to_string()));
    }

    #[test]
    fn form_tags_are_mutually_exclusive() {
        let mut f = MatchFeatures::default();
        f.home_win_rate = 20.0;
        assert!(extract_condition_tags(&f).contains(&"home_poor_form".to_string()));
        f.home_win_rate = 80.0;
        let tags = extract_condition_tags(&f);
        assert!(tags.contains(&"home_hot_form".to_string()));
        assert!(!tags.contains(&"home_poor_form".to_string()));
    }

    #[test]
    fn compound_key_is_sorted_and_joined() {
        let mut f = MatchFeatures::default();
        f.sharp_money_flag = 1.0;
        f.derby_flag = 1.0;
        f.home_injury_count = 9.0;
        let tags = extract_condition_tags(&f);
        // alphabetical regardless of rule order
        assert_eq!(
            compound_key(&tags),
            "derby_match&home_injury_crisis&sharp_money"
        );
    }
}
