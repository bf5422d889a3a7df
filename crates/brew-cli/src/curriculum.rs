//! The fixed learning curriculum: three pillars of five questions each

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pillar {
    pub name: &'static str,
    pub short_name: &'static str,
    pub icon: &'static str,
    pub questions: [&'static str; 5],
}

pub const CURRICULUM: [Pillar; 3] = [
    Pillar {
        name: "Pillar 1: Coffee Sensory Evaluation & Flavor Science",
        short_name: "Sensory & Flavor",
        icon: "👅",
        questions: [
            "How are coffee flavors categorized across aroma, taste, and aftertaste?",
            "What is the role of the World Coffee Research Sensory Lexicon, and how are its intensity scales applied in practice?",
            "How can I describe coffee flavors precisely during a cupping session?",
            "How can I design a simple comparative tasting to train my palate in recognizing sweetness and acidity?",
            "How do different processing methods (washed, natural, and honey) shape a coffee's sensory profile?",
        ],
    },
    Pillar {
        name: "Pillar 2: Espresso Mastery & Milk-Based Drinks",
        short_name: "Espresso & Milk",
        icon: "☕",
        questions: [
            "How do grind size and dose affect espresso extraction?",
            "What is the ideal espresso brewing temperature and pressure?",
            "How does milk steaming temperature influence foam quality?",
            "What are the key steps to dial in espresso properly?",
            "What are the differences between latte, cappuccino, and flat white textures?",
        ],
    },
    Pillar {
        name: "Pillar 3: Hand-Brewed Coffee Methods",
        short_name: "Hand Brewing",
        icon: "🫖",
        questions: [
            "What is the optimal coffee-to-water ratio for V60 brewing?",
            "How does water temperature affect extraction in pour-over methods?",
            "What's the difference between immersion and percolation brewing?",
            "How does pouring technique influence agitation and flavor?",
            "How do various brewing methods highlight different coffee origins?",
        ],
    },
];

pub fn total_questions() -> usize {
    CURRICULUM.iter().map(|p| p.questions.len()).sum()
}

/// Curriculum question matching `text` after trimming and lowercasing,
/// as `(pillar index, canonical question)`
pub fn find_question(text: &str) -> Option<(usize, &'static str)> {
    let normalized = text.trim().to_lowercase();
    CURRICULUM.iter().enumerate().find_map(|(i, pillar)| {
        pillar
            .questions
            .iter()
            .find(|q| q.trim().to_lowercase() == normalized)
            .map(|q| (i, *q))
    })
}

/// Question by 1-based pillar and question numbers, as typed by a learner
pub fn question_at(pillar: usize, question: usize) -> Option<&'static str> {
    CURRICULUM
        .get(pillar.checked_sub(1)?)?
        .questions
        .get(question.checked_sub(1)?)
        .copied()
}
