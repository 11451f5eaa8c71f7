use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt construction strategy under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptVariant {
    ZeroShot,
    ChainOfThought,
    FewShotStructured,
}

impl PromptVariant {
    /// All variants in evaluation order
    pub const ALL: [PromptVariant; 3] = [
        PromptVariant::ZeroShot,
        PromptVariant::ChainOfThought,
        PromptVariant::FewShotStructured,
    ];

    /// Name written to the `prompt_version` column of the results file
    pub fn label(&self) -> &'static str {
        match self {
            PromptVariant::ZeroShot => "Zero-Shot",
            PromptVariant::ChainOfThought => "Chain-of-Thought",
            PromptVariant::FewShotStructured => "Few-Shot-Structured",
        }
    }

    /// Render the prompt for a single review
    pub fn render(&self, review_text: &str) -> String {
        match self {
            PromptVariant::ZeroShot => format!(
                "Classify the following Yelp review into a 1-5 star rating.\n\
                 Return the result as a valid JSON object with keys \"predicted_stars\" (integer) \
                 and \"explanation\" (string).\n\
                 \n\
                 Review: \"{review_text}\"\n"
            ),
            PromptVariant::ChainOfThought => format!(
                "Analyze the sentiment of this Yelp review step by step to determine its star rating (1-5).\n\
                 First, identify the positive and negative aspects it mentions.\n\
                 Then, weigh them against each other to decide the final rating.\n\
                 Finally, format your output as a valid JSON object with the keys:\n\
                 - \"predicted_stars\": (integer)\n\
                 - \"explanation\": (string, your reasoning)\n\
                 \n\
                 Review: \"{review_text}\"\n"
            ),
            PromptVariant::FewShotStructured => format!(
                "You are an expert sentiment analyzer. Rate the following Yelp review from 1 to 5 stars.\n\
                 \n\
                 Examples:\n\
                 {FEW_SHOT_EXAMPLES}\
                 \n\
                 Task:\n\
                 Review: \"{review_text}\"\n\
                 \n\
                 Return ONLY the valid JSON object.\n"
            ),
        }
    }
}

const FEW_SHOT_EXAMPLES: &str = concat!(
    "Review: \"The food was disgusting and cold.\" -> ",
    "{\"predicted_stars\": 1, \"explanation\": \"Strong negative sentiment about food quality.\"}\n",
    "Review: \"Amazing experience, will definitely come back!\" -> ",
    "{\"predicted_stars\": 5, \"explanation\": \"Strong positive enthusiasm and loyalty.\"}\n",
    "Review: \"It was okay, but a bit pricey.\" -> ",
    "{\"predicted_stars\": 3, \"explanation\": \"Mixed sentiment: acceptable quality but poor value.\"}\n",
);

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
