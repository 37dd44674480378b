//! Built-in financial-literacy games.
//!
//! Amounts are in rupees. Trait names shared across games:
//! `risk_tolerance`, `knowledge`, `confidence`, `discipline`; financial
//! values: `net_worth`, `savings`, `debt`, `credit_score`.

use std::collections::BTreeMap;

use super::types::{
    AccumulationPolicy, Bounds, Choice, GameDefinition, Horizon, Metric, Scenario, SummaryRules,
    TagRule, Tier,
};

/// Personality traits clamped to `[0, 100]` in the enhanced game.
pub const PERSONALITY_TRAITS: [&str; 4] = ["risk_tolerance", "knowledge", "confidence", "discipline"];

/// Bounds for the credit-score-like metric in the enhanced game.
pub const CREDIT_SCORE_BOUNDS: Bounds = Bounds::Clamped { min: 0, max: 900 };

/// Bounds for personality traits in the enhanced game.
pub const TRAIT_BOUNDS: Bounds = Bounds::Clamped { min: 0, max: 100 };

/// Net worth at or above which the FIRE game counts as achieved.
pub const FIRE_NET_WORTH: i64 = 5_000_000;

/// Net worth at or above which the FIRE game counts as close.
pub const FIRE_CLOSE_NET_WORTH: i64 = 2_500_000;

/// Net worth at or above which the FIRE game counts as building momentum.
pub const FIRE_MOMENTUM_NET_WORTH: i64 = 1_000_000;

/// Tag rules shared by the built-in games.
fn common_tag_rules() -> Vec<TagRule> {
    vec![
        TagRule::new(
            "career_decline",
            "Declined a sponsored course or stretch role that would have grown your earning power.",
            "Treat skills as your highest-return asset early in your career; say yes to paid upskilling.",
        ),
        TagRule::new(
            "lifestyle_inflation",
            "Let spending rise as fast as income.",
            "Bank at least half of every raise before upgrading your lifestyle.",
        ),
        TagRule::new(
            "party_spending",
            "Spent savings on parties and trips you had not budgeted for.",
            "Set a monthly fun budget and pay for it from income, not savings.",
        ),
        TagRule::new(
            "fomo_investing",
            "Invested on fear of missing out instead of a plan.",
            "Only invest in what you understand and keep speculative bets under 5% of your portfolio.",
        ),
        TagRule::new(
            "panic_selling",
            "Sold in a panic and locked in losses.",
            "Decide your exit rules before you invest, not during a crash.",
        ),
        TagRule::new(
            "grand_wedding",
            "Financed a grand wedding with debt.",
            "Celebrate within your means; a loan-funded wedding can delay financial independence by years.",
        ),
        TagRule::new(
            "credit_card_debt",
            "Carried a credit card balance at 36-42% annual interest.",
            "Pay the full statement balance every month or do not use the card.",
        ),
        TagRule::new(
            "emi_trap",
            "Took on EMIs or instant loans for wants, not needs.",
            "Keep total EMIs under 30% of take-home pay and avoid app-based instant loans.",
        ),
        TagRule::new(
            "inflation_blind_spot",
            "Kept long-term money in instruments that lose to inflation.",
            "Money you will not touch for 5+ years belongs in diversified equity, not only deposits.",
        ),
        TagRule::new(
            "tax_neglect",
            "Skipped tax planning and paid more tax than needed.",
            "Use Section 80C and NPS deductions every year, starting in April, not March.",
        ),
    ]
}

/// Multi-path stage game: money mindset basics, unclamped accumulation.
pub fn multi_path_stage1_game() -> GameDefinition {
    GameDefinition {
        id: "multi_path_stage1".to_string(),
        name: "Money Mindset: Stage 1".to_string(),
        description: "Your first paycheck and the habits it sets up. Every path changes your money personality."
            .to_string(),
        start: "money_mindset_start".to_string(),
        terminal_ids: ["investment_philosophy_deep_dive".to_string()].into(),
        initial_traits: BTreeMap::new(),
        policy: AccumulationPolicy::unclamped(),
        transition_delay_ms: None,
        summary: SummaryRules {
            tag_rules: common_tag_rules(),
            tier_metric: Metric::Score,
            tiers: vec![
                Tier::at_least(250, "Money Master", "You plan first and spend second. Stage 2 awaits."),
                Tier::at_least(150, "On Track", "Good instincts with a few costly detours."),
                Tier::at_least(80, "Getting Started", "You are learning; revisit the advice below."),
                Tier::otherwise("Needs Guidance", "Start with a budget and an emergency fund before anything else."),
            ],
            ..SummaryRules::default()
        },
        scenarios: vec![
            Scenario::new("money_mindset_start", "Your First Paycheck")
                .with_description("Your first salary of 45,000 just landed. What do you do with it?")
                .with_choice(
                    Choice::new("strategic_planner", "Write a budget, build an emergency fund, then invest the rest")
                        .leads_to("investment_philosophy_deep_dive")
                        .with_score(95)
                        .with_impact("risk_tolerance", 20)
                        .with_impact("knowledge", 30)
                        .with_impact("confidence", 20)
                        .with_impact("discipline", 35)
                        .with_feedback(Horizon::Immediate, "You know exactly where every rupee goes.")
                        .with_feedback(Horizon::ShortTerm, "Three months of expenses saved; surprises no longer scare you.")
                        .with_feedback(Horizon::LongTerm, "Compounding starts early and works for you for decades.")
                        .with_tag("planned_budget"),
                )
                .with_choice(
                    Choice::new("social_first", "Celebrate with friends and figure out money later")
                        .leads_to("social_pressure_test")
                        .with_score(40)
                        .with_impact("risk_tolerance", 60)
                        .with_impact("knowledge", -15)
                        .with_impact("confidence", 25)
                        .with_impact("discipline", -30)
                        .with_feedback(Horizon::Immediate, "Great night out. A third of the salary is gone.")
                        .with_feedback(Horizon::ShortTerm, "Month-end arrives before the money does.")
                        .with_feedback(Horizon::LongTerm, "Habits formed now are hard to undo.")
                        .with_tag("lifestyle_inflation"),
                )
                .with_choice(
                    Choice::new("cautious_saver", "Put everything in a savings account and touch nothing")
                        .leads_to("savings_comfort_zone")
                        .with_score(70)
                        .with_impact("risk_tolerance", -20)
                        .with_impact("knowledge", 10)
                        .with_impact("confidence", 5)
                        .with_impact("discipline", 25)
                        .with_feedback(Horizon::Immediate, "Safe and sound, earning 3%.")
                        .with_feedback(Horizon::LongTerm, "Inflation at 6% quietly shrinks what you saved."),
                )
                .with_choice(
                    Choice::new("fomo_investor", "Put it all into the coin your roommate keeps talking about")
                        .leads_to("crypto_fallout")
                        .with_score(20)
                        .with_impact("risk_tolerance", 80)
                        .with_impact("knowledge", -10)
                        .with_impact("confidence", 30)
                        .with_impact("discipline", -20)
                        .with_feedback(Horizon::Immediate, "Up 12% on day one. You feel like a genius.")
                        .with_feedback(Horizon::ShortTerm, "Volatility you were not ready for.")
                        .with_tag("fomo_investing"),
                ),
            Scenario::new("social_pressure_test", "The Weekend Trip")
                .with_description("Friends plan a Goa trip costing half of what you have left. Everyone is going.")
                .with_choice(
                    Choice::new("set_trip_budget", "Go, but fix a spending cap before you leave")
                        .leads_to("course_offer")
                        .with_score(60)
                        .with_impact("risk_tolerance", 10)
                        .with_feedback(Horizon::Immediate, "You enjoy the trip and come back with money left."),
                )
                .with_choice(
                    Choice::new("party_on_credit", "Go all in and put it on the credit card")
                        .leads_to("course_offer")
                        .with_score(15)
                        .with_impact("risk_tolerance", 15)
                        .with_impact("discipline", -25)
                        .with_impact("debt", 20_000)
                        .with_feedback(Horizon::Immediate, "Unforgettable party.")
                        .with_feedback(Horizon::ShortTerm, "A 20,000 card bill at 3.5% a month.")
                        .with_tag("party_spending")
                        .with_tag("credit_card_debt"),
                )
                .with_choice(
                    Choice::new("skip_trip", "Skip it and save")
                        .leads_to("course_offer")
                        .with_score(55)
                        .with_impact("discipline", 15)
                        .with_impact("confidence", -5)
                        .with_feedback(Horizon::Immediate, "A little left out, a lot less stressed."),
                ),
            Scenario::new("savings_comfort_zone", "Inflation Check")
                .with_description("A colleague shows you how index funds beat your savings account over ten years.")
                .with_choice(
                    Choice::new("start_sip", "Start a 5,000 monthly index fund SIP")
                        .leads_to("course_offer")
                        .with_score(80)
                        .with_impact("risk_tolerance", 15)
                        .with_impact("knowledge", 20)
                        .with_feedback(Horizon::LongTerm, "Small, automatic, and compounding."),
                )
                .with_choice(
                    Choice::new("stay_in_fd", "Stick to fixed deposits; markets are gambling")
                        .leads_to("course_offer")
                        .with_score(45)
                        .with_impact("risk_tolerance", -10)
                        .with_feedback(Horizon::LongTerm, "Your real returns hover near zero.")
                        .with_tag("inflation_blind_spot"),
                ),
            Scenario::new("crypto_fallout", "The Crash")
                .with_description("The coin falls 70% in a week. Group chats are in meltdown.")
                .with_choice(
                    Choice::new("panic_sell", "Sell everything before it goes to zero")
                        .leads_to("course_offer")
                        .with_score(10)
                        .with_impact("confidence", -30)
                        .with_impact("net_worth", -35_000)
                        .with_feedback(Horizon::Immediate, "Loss locked in.")
                        .with_tag("panic_selling"),
                )
                .with_choice(
                    Choice::new("hold_and_learn", "Hold, and read up on what you actually bought")
                        .leads_to("course_offer")
                        .with_score(45)
                        .with_impact("knowledge", 20)
                        .with_feedback(Horizon::ShortTerm, "You learn more about risk than any course could teach."),
                ),
            Scenario::new("course_offer", "Learning Opportunity")
                .with_description("Your employer offers to sponsor a weekend personal-finance certification.")
                .with_choice(
                    Choice::new("accept_course", "Accept the course")
                        .with_score(85)
                        .with_impact("knowledge", 30)
                        .with_impact("confidence", 10)
                        .with_feedback(Horizon::LongTerm, "Knowledge compounds like money does."),
                )
                .with_choice(
                    Choice::new("decline_course", "Decline Course; weekends are for rest")
                        .with_score(20)
                        .with_impact("knowledge", -5)
                        .with_feedback(Horizon::LongTerm, "The gap between you and your peers widens.")
                        .with_tag("career_decline"),
                ),
        ],
    }
}

/// Salaried professional FIRE game, tiered on final net worth.
pub fn salaried_fire_game() -> GameDefinition {
    GameDefinition {
        id: "salaried_fire".to_string(),
        name: "Salaried Professional: Road to FIRE".to_string(),
        description: "Five years of salaried life. Reach financial independence before your peers."
            .to_string(),
        start: "fire_start".to_string(),
        terminal_ids: Default::default(),
        initial_traits: BTreeMap::from([
            ("net_worth".to_string(), 500_000),
            ("savings".to_string(), 100_000),
            ("debt".to_string(), 0),
        ]),
        policy: AccumulationPolicy::unclamped(),
        transition_delay_ms: None,
        summary: SummaryRules {
            tag_rules: common_tag_rules(),
            tier_metric: Metric::Trait("net_worth".to_string()),
            tiers: vec![
                Tier::at_least(FIRE_NET_WORTH, "FIRE Achieved", "Work is now optional. You retired early on your own terms."),
                Tier::at_least(FIRE_CLOSE_NET_WORTH, "Close to FIRE", "A few more disciplined years and you are there."),
                Tier::at_least(FIRE_MOMENTUM_NET_WORTH, "Building Momentum", "The foundation is in place; cut the leaks below."),
                Tier::otherwise("Restart Required", "Your choices kept you on the treadmill. Try a different path."),
            ],
            ..SummaryRules::default()
        },
        scenarios: vec![
            Scenario::new("fire_start", "The Raise")
                .with_description("You got a 40% hike. Your colleagues are booking new cars.")
                .with_choice(
                    Choice::new("invest_hike", "Route the entire raise into index fund SIPs")
                        .leads_to("career_crossroads")
                        .with_score(90)
                        .with_impact("net_worth", 1_800_000)
                        .with_impact("savings", 300_000)
                        .with_impact("discipline", 20)
                        .with_feedback(Horizon::Immediate, "Nothing changes day to day.")
                        .with_feedback(Horizon::LongTerm, "Your portfolio quietly becomes your biggest earner."),
                )
                .with_choice(
                    Choice::new("upgrade_lifestyle", "Upgrade the apartment and the car to match the salary")
                        .leads_to("career_crossroads")
                        .with_score(30)
                        .with_impact("net_worth", 200_000)
                        .with_impact("debt", 800_000)
                        .with_impact("discipline", -20)
                        .with_feedback(Horizon::Immediate, "The new place feels amazing.")
                        .with_feedback(Horizon::LongTerm, "EMIs absorb every future raise.")
                        .with_tag("lifestyle_inflation")
                        .with_tag("emi_trap"),
                )
                .with_choice(
                    Choice::new("split_raise", "Split the raise evenly between investing and spending")
                        .leads_to("career_crossroads")
                        .with_score(65)
                        .with_impact("net_worth", 900_000)
                        .with_impact("savings", 150_000)
                        .with_feedback(Horizon::LongTerm, "Balanced, if slower."),
                ),
            Scenario::new("career_crossroads", "Stretch Role")
                .with_description("Your manager offers a stretch role with a two-year upskilling track.")
                .with_choice(
                    Choice::new("accept_stretch", "Accept the role and the course")
                        .leads_to("wedding_planning")
                        .with_score(85)
                        .with_impact("net_worth", 1_200_000)
                        .with_impact("knowledge", 25)
                        .with_feedback(Horizon::LongTerm, "Two promotions in three years."),
                )
                .with_choice(
                    Choice::new("decline_course", "Decline Course and keep the comfortable role")
                        .leads_to("wedding_planning")
                        .with_score(25)
                        .with_impact("net_worth", 100_000)
                        .with_feedback(Horizon::LongTerm, "Your salary plateaus while peers move ahead.")
                        .with_tag("career_decline"),
                ),
            Scenario::new("wedding_planning", "The Wedding")
                .with_description("Both families have opinions about how big the wedding should be.")
                .with_choice(
                    Choice::new("simple_wedding", "A simple wedding paid from savings")
                        .leads_to("market_crash")
                        .with_score(80)
                        .with_impact("net_worth", -300_000)
                        .with_feedback(Horizon::Immediate, "An intimate, joyful day."),
                )
                .with_choice(
                    Choice::new("grand_wedding", "Grand Wedding financed with a personal loan")
                        .leads_to("market_crash")
                        .with_score(20)
                        .with_impact("net_worth", -2_000_000)
                        .with_impact("debt", 1_500_000)
                        .with_feedback(Horizon::Immediate, "Five hundred guests and a viral video.")
                        .with_feedback(Horizon::LongTerm, "Loan repayments run for seven years.")
                        .with_tag("grand_wedding"),
                ),
            Scenario::new("market_crash", "Market Crash")
                .with_description("Markets fall 30% in a quarter. Your portfolio is deep red.")
                .with_choice(
                    Choice::new("stay_the_course", "Keep every SIP running and rebalance")
                        .with_score(90)
                        .with_impact("net_worth", 2_500_000)
                        .with_feedback(Horizon::LongTerm, "You bought cheap; the recovery rewards you."),
                )
                .with_choice(
                    Choice::new("fomo_rotation", "Sell the index funds and chase the hot sector (FOMO)")
                        .with_score(15)
                        .with_impact("net_worth", -500_000)
                        .with_feedback(Horizon::ShortTerm, "The hot sector cools the week after you buy.")
                        .with_tag("fomo_investing"),
                )
                .with_choice(
                    Choice::new("pause_sip", "Pause SIPs until things settle")
                        .with_score(45)
                        .with_impact("net_worth", 600_000)
                        .with_feedback(Horizon::LongTerm, "You miss the cheapest months of the decade."),
                ),
        ],
    }
}

/// Enhanced salaried game: clamped personality traits and credit score.
pub fn enhanced_salaried_game() -> GameDefinition {
    let mut policy = AccumulationPolicy::unclamped().with_trait("credit_score", CREDIT_SCORE_BOUNDS);
    for name in PERSONALITY_TRAITS {
        policy = policy.with_trait(name, TRAIT_BOUNDS);
    }

    GameDefinition {
        id: "enhanced_salaried".to_string(),
        name: "Salaried Life: Credit and Cash Flow".to_string(),
        description: "Manage credit, emergencies and taxes. Your credit score follows you.".to_string(),
        start: "credit_card_offer".to_string(),
        terminal_ids: Default::default(),
        initial_traits: BTreeMap::from([
            ("risk_tolerance".to_string(), 50),
            ("knowledge".to_string(), 40),
            ("confidence".to_string(), 50),
            ("discipline".to_string(), 50),
            ("credit_score".to_string(), 650),
            ("net_worth".to_string(), 0),
        ]),
        policy,
        transition_delay_ms: Some(1500),
        summary: SummaryRules {
            tag_rules: common_tag_rules(),
            tier_metric: Metric::Score,
            tiers: vec![
                Tier::at_least(200, "Financially Fluent", "Your credit and cash flow are in excellent shape."),
                Tier::at_least(120, "Steady Saver", "Mostly sound choices; tighten the weak spots."),
                Tier::otherwise("Learning the Ropes", "Start with the basics: pay in full, save first, plan taxes early."),
            ],
            ..SummaryRules::default()
        },
        scenarios: vec![
            Scenario::new("credit_card_offer", "Premium Credit Card")
                .with_description("Your bank offers a premium card with a 5 lakh limit and airport lounge access.")
                .with_choice(
                    Choice::new("pay_in_full", "Take it, use it for bills and pay the full balance monthly")
                        .leads_to("emergency_fund")
                        .with_score(90)
                        .with_impact("credit_score", 40)
                        .with_impact("discipline", 15)
                        .with_impact("knowledge", 10)
                        .with_feedback(Horizon::Immediate, "Rewards points and zero interest.")
                        .with_feedback(Horizon::ThreeMonths, "Your credit score starts climbing.")
                        .with_feedback(Horizon::OneYear, "Lenders start offering you better rates.")
                        .with_feedback(Horizon::FiveYears, "A 780+ score saves lakhs on your home loan."),
                )
                .with_choice(
                    Choice::new("minimum_due", "Use it freely and pay only the minimum due")
                        .leads_to("emergency_fund")
                        .with_score(15)
                        .with_impact("credit_score", -120)
                        .with_impact("discipline", -30)
                        .with_impact("debt", 150_000)
                        .with_feedback(Horizon::Immediate, "Shopping feels free.")
                        .with_feedback(Horizon::ThreeMonths, "Interest compounds at 42% a year.")
                        .with_feedback(Horizon::OneYear, "The balance has doubled.")
                        .with_feedback(Horizon::FiveYears, "Still paying for things you no longer own.")
                        .with_tag("credit_card_debt"),
                )
                .with_choice(
                    Choice::new("decline_card", "Decline; you do not need more credit")
                        .leads_to("emergency_fund")
                        .with_score(55)
                        .with_impact("confidence", 5)
                        .with_feedback(Horizon::OneYear, "Safe, but your credit history stays thin."),
                ),
            Scenario::new("emergency_fund", "Medical Emergency")
                .with_description("A hospital bill of 80,000 arrives with no warning.")
                .with_choice(
                    Choice::new("use_emergency_fund", "Pay from your emergency fund")
                        .leads_to("tax_season")
                        .with_score(85)
                        .with_impact("confidence", 20)
                        .with_impact("net_worth", -80_000)
                        .with_feedback(Horizon::Immediate, "Handled. No loans, no stress.")
                        .with_feedback(Horizon::ThreeMonths, "You rebuild the fund with a standing transfer."),
                )
                .with_choice(
                    Choice::new("borrow_from_app", "Take an instant loan from a lending app")
                        .leads_to("tax_season")
                        .with_score(10)
                        .with_impact("credit_score", -80)
                        .with_impact("debt", 90_000)
                        .with_impact("net_worth", -95_000)
                        .with_feedback(Horizon::Immediate, "Money in your account in five minutes.")
                        .with_feedback(Horizon::ThreeMonths, "Recovery calls start at 8 a.m.")
                        .with_tag("emi_trap"),
                ),
            Scenario::new("tax_season", "Tax Season")
                .with_description("HR needs your investment declarations by Friday.")
                .with_choice(
                    Choice::new("elss_and_nps", "Invest in ELSS and NPS to use your deductions")
                        .with_score(80)
                        .with_impact("knowledge", 20)
                        .with_impact("net_worth", 150_000)
                        .with_feedback(Horizon::OneYear, "Lower tax and a growing retirement corpus."),
                )
                .with_choice(
                    Choice::new("ignore_tax_planning", "Skip it; tax planning is too confusing")
                        .with_score(30)
                        .with_impact("net_worth", -50_000)
                        .with_feedback(Horizon::OneYear, "You paid 46,800 more tax than you had to.")
                        .with_tag("tax_neglect"),
                ),
        ],
    }
}

/// All built-in games.
pub fn builtin_games() -> Vec<GameDefinition> {
    vec![
        multi_path_stage1_game(),
        salaried_fire_game(),
        enhanced_salaried_game(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::graph::validate;

    #[test]
    fn test_builtins_have_no_integrity_errors() {
        for game in builtin_games() {
            let report = validate(&game);
            assert!(report.is_valid(), "{}: {:?}", game.id, report.errors);
            assert_eq!(report.dangling_count(), 0);
            assert!(report.unreachable.is_empty(), "{}: {:?}", game.id, report.unreachable);
        }
    }

    #[test]
    fn test_builtin_ids_unique() {
        let mut ids: Vec<_> = builtin_games().into_iter().map(|g| g.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_every_tag_has_a_rule() {
        for game in builtin_games() {
            let known: Vec<_> = game.summary.tag_rules.iter().map(|r| r.tag.as_str()).collect();
            for scenario in &game.scenarios {
                for choice in &scenario.choices {
                    for tag in &choice.tags {
                        // planned_budget is a positive marker with no mistake narrative
                        if tag != "planned_budget" {
                            assert!(known.contains(&tag.as_str()), "{} has no rule", tag);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_enhanced_policy_clamps_personality_and_credit() {
        let game = enhanced_salaried_game();
        for name in PERSONALITY_TRAITS {
            assert_eq!(game.policy.bounds_for(name), TRAIT_BOUNDS);
        }
        assert_eq!(game.policy.bounds_for("credit_score"), CREDIT_SCORE_BOUNDS);
        assert_eq!(game.policy.bounds_for("net_worth"), Bounds::Unclamped);
        assert_eq!(game.transition_delay_ms, Some(1500));
    }

    #[test]
    fn test_fire_tiers_are_descending() {
        let game = salaried_fire_game();
        let mins: Vec<_> = game.summary.tiers.iter().filter_map(|t| t.min).collect();
        assert!(mins.windows(2).all(|w| w[0] > w[1]));
        assert!(game.summary.tiers.last().is_some_and(|t| t.min.is_none()));
    }
}
