//! Prompt composition.
//!
//! A prompt is a fixed header describing the project, followed by a
//! module-specific task and the JSON shape the model must answer with.
//! Composition is deterministic and never fails; an unknown module name
//! composes to an empty string.

use serde::Serialize;

use crate::context::{limit_text, GenerationContext};
use crate::models::Module;

/// Characters of free-text input included in a prompt
pub const INPUT_CHARS: usize = 1200;

/// Characters of draft text included in a prompt
pub const DRAFT_CHARS: usize = 2000;

/// Characters of aggregated reference text included in a prompt
pub const REFERENCE_CHARS: usize = 3500;

/// Reference titles listed in a prompt
pub const MAX_REFERENCE_TITLES: usize = 8;

const SYSTEM_ZH: &str = "你是一名严谨的博士论文写作助手。请基于用户提供的项目信息与参考文献摘录完成任务，\
不要编造不存在的数据。只输出符合要求的 JSON，不要输出任何额外说明。";

const SYSTEM_EN: &str = "You are a rigorous dissertation writing assistant. Complete the task using \
the project details and reference excerpts provided, and do not invent data. Respond with JSON \
matching the requested schema only, without any extra commentary.";

/// The two parts of a provider request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// System instruction
    pub system: String,

    /// Task prompt
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// System instruction and task as one text, for providers without a
    /// separate system role
    pub fn combined(&self) -> String {
        if self.system.is_empty() {
            self.user.clone()
        } else {
            format!("{}\n\n{}", self.system, self.user)
        }
    }
}

/// System instruction in the request's language
pub fn system_instruction(is_zh: bool) -> &'static str {
    if is_zh {
        SYSTEM_ZH
    } else {
        SYSTEM_EN
    }
}

/// JSON shape the model must answer with for a module
pub fn output_schema(module: Module) -> &'static str {
    match module {
        Module::Topic => r#"{"titles": ["<title>", "..."]}"#,
        Module::Outline => r#"{"sections": ["<section title>", "..."], "logic": ["<logic point>", "..."]}"#,
        Module::Draft => r#"{"draft": "<paragraphs>"}"#,
        Module::Polish => r#"{"polished": "<polished text>"}"#,
        Module::Search => {
            r#"{"results": [{"title": "<title>", "year": 2023, "source": "<journal or venue>"}]}"#
        }
        Module::Citations => r#"{"citationBlock": "<citation suggestions>"}"#,
    }
}

/// Compose the task prompt for a module given by name.
///
/// Returns an empty string when the name is not a known module.
pub fn compose(module_name: &str, context: &GenerationContext) -> String {
    match module_name.parse::<Module>() {
        Ok(module) => compose_module(module, context),
        Err(_) => String::new(),
    }
}

/// Compose the task prompt for a module
pub fn compose_module(module: Module, context: &GenerationContext) -> String {
    let mut prompt = header(context);
    prompt.push_str("\n\n");
    prompt.push_str(&task(module, context));
    prompt.push_str("\n\n");
    if context.is_zh {
        prompt.push_str("只输出以下 JSON 结构：\n");
    } else {
        prompt.push_str("Return only JSON with this structure:\n");
    }
    prompt.push_str(output_schema(module));
    prompt
}

fn header(context: &GenerationContext) -> String {
    let or_dash = |s: String| if s.is_empty() { "-".to_string() } else { s };

    let keywords = or_dash(context.keywords.join(" / "));
    let input = or_dash(limit_text(&context.input, INPUT_CHARS));
    let draft = or_dash(limit_text(&context.draft_text, DRAFT_CHARS));
    let titles = or_dash(
        context
            .reference_names
            .iter()
            .take(MAX_REFERENCE_TITLES)
            .cloned()
            .collect::<Vec<_>>()
            .join("; "),
    );
    let excerpts = or_dash(limit_text(&context.reference_text, REFERENCE_CHARS));

    let labels = if context.is_zh {
        [
            "写作语言", "研究领域", "研究方法", "关键词", "核心研究问题", "目标读者",
            "用户输入", "草稿内容", "参考文献", "参考文献摘录",
        ]
    } else {
        [
            "Writing language",
            "Research field",
            "Method",
            "Keywords",
            "Core research question",
            "Target audience",
            "User input",
            "Draft text",
            "Reference titles",
            "Reference excerpts",
        ]
    };
    let values = [
        context.language.label().to_string(),
        context.field.clone(),
        context.method.clone(),
        keywords,
        context.core_question.clone(),
        context.audience.clone(),
        input,
        draft,
        titles,
    ];

    let mut header = String::new();
    for (label, value) in labels.iter().zip(values.iter()) {
        header.push_str(label);
        header.push_str(": ");
        header.push_str(value);
        header.push('\n');
    }
    header.push_str(labels[9]);
    header.push_str(":\n");
    header.push_str(&excerpts);
    header
}

fn task(module: Module, context: &GenerationContext) -> String {
    let focus = &context.focus;
    if context.is_zh {
        match module {
            Module::Topic => format!(
                "任务：围绕“{}”提出 5 个博士论文题目，题目需体现研究领域与研究方法，表述学术、具体、可研究。",
                focus
            ),
            Module::Outline => format!(
                "任务：为“{}”设计博士论文章节结构（sections），并给出各章节之间的论证逻辑要点（logic）。",
                focus
            ),
            Module::Draft => format!(
                "任务：结合参考文献摘录，围绕“{}”撰写两段学术正文，说明研究动机、理论背景与研究框架。",
                focus
            ),
            Module::Polish => "任务：润色用户输入的段落，统一术语、优化逻辑衔接并提升学术表达，保持原意不变。".to_string(),
            Module::Search => format!(
                "任务：根据参考文献摘录与“{}”推荐 3 到 5 篇相关文献，给出题目、年份与来源期刊。",
                focus
            ),
            Module::Citations => "任务：根据草稿内容与参考文献，给出应插入的引用建议，注明引用位置与对应文献。".to_string(),
        }
    } else {
        match module {
            Module::Topic => format!(
                "Task: propose 5 dissertation titles about \"{}\". Each title should reflect the research field and method and be specific and researchable.",
                focus
            ),
            Module::Outline => format!(
                "Task: design the chapter structure (sections) of a dissertation on \"{}\" and list the argumentative logic connecting the chapters (logic).",
                focus
            ),
            Module::Draft => format!(
                "Task: using the reference excerpts, write two academic paragraphs on \"{}\" covering motivation, theoretical background and the research framework.",
                focus
            ),
            Module::Polish => "Task: polish the paragraph in the user input. Align terminology, improve flow and academic tone, and keep the original meaning.".to_string(),
            Module::Search => format!(
                "Task: recommend 3 to 5 related publications for \"{}\" based on the reference excerpts, with title, year and source venue.",
                focus
            ),
            Module::Citations => "Task: suggest citations to insert into the draft text, naming where each citation belongs and which reference supports it.".to_string(),
        }
    }
}
