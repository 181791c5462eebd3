//! Deterministic template results used when no model answer is available.

use crate::context::GenerationContext;
use crate::models::{CanonicalResult, Module, SearchRecord};

const PLACEHOLDER_CITATIONS: [&str; 2] = ["Smith et al. (2023)", "Li & Zhao (2022)"];

/// Generate a result for a module from the context alone. Never fails.
pub fn generate(module: Module, context: &GenerationContext) -> CanonicalResult {
    match module {
        Module::Topic => topic(context),
        Module::Outline => outline(context),
        Module::Draft => draft(context),
        Module::Polish => polish(context),
        Module::Search => search(context),
        Module::Citations => citations(context),
    }
}

fn topic(ctx: &GenerationContext) -> CanonicalResult {
    let (focus, field, method) = (&ctx.focus, &ctx.field, &ctx.method);
    let titles = if ctx.is_zh {
        vec![
            format!("基于{}的{}博士论文题目探析", focus, field),
            format!("{}中{}的理论与实践研究", field, focus),
            format!("面向{}的{}机制构建与验证", field, focus),
            format!("{}视角下{}中{}的系统研究", method, field, focus),
            format!("{}驱动的{}创新路径研究", focus, field),
        ]
    } else {
        vec![
            format!("A {} Study on {} in {}", method, focus, field),
            format!("{}: A Framework for {} Innovation", focus, field),
            format!("Understanding {} Dynamics within {}", focus, field),
            format!("{} Transformation Through {}", field, focus),
            format!("Evidence-Based Insights on {} in {}", focus, field),
        ]
    };
    CanonicalResult::Topic { titles }
}

fn outline(ctx: &GenerationContext) -> CanonicalResult {
    let (sections, logic): (&[&str], &[&str]) = if ctx.is_zh {
        (
            &["引言", "文献综述", "研究设计", "数据与方法", "结果与讨论", "结论与展望"],
            &[
                "从研究背景切入，定义问题与研究目标",
                "梳理关键文献并定位研究空白",
                "构建理论与方法框架",
                "验证假设并输出关键发现",
                "总结贡献与未来研究方向",
            ],
        )
    } else {
        (
            &[
                "Introduction",
                "Literature Review",
                "Research Design",
                "Data & Methods",
                "Results & Discussion",
                "Conclusion",
            ],
            &[
                "Frame the research gap and objectives",
                "Review and synthesize core literature",
                "Present the theoretical and methodological framework",
                "Validate hypotheses and discuss findings",
                "Summarize contributions and future work",
            ],
        )
    };
    CanonicalResult::Outline {
        sections: sections.iter().map(|s| s.to_string()).collect(),
        logic: logic.iter().map(|s| s.to_string()).collect(),
    }
}

fn draft(ctx: &GenerationContext) -> CanonicalResult {
    let (focus, field, method) = (&ctx.focus, &ctx.field, &ctx.method);
    let draft = if ctx.is_zh {
        format!(
            "本节围绕{focus}展开，首先阐明研究动机与理论背景，并指出{field}中的关键挑战。随后结合{method}提出研究框架，形成可验证的研究命题。\n\n\
             通过对核心变量的分析，初步发现{focus}在{field}场景中呈现出显著的结构性特征，为后续实证验证奠定基础。"
        )
    } else {
        format!(
            "This section focuses on {focus}. It outlines the motivation and theoretical background, highlighting the key challenges in {field}. A {method} framework is proposed to shape testable propositions.\n\n\
             Preliminary analysis suggests that {focus} exhibit distinctive structural patterns in {field}, setting the stage for empirical validation."
        )
    };
    CanonicalResult::Draft { draft }
}

fn polish(ctx: &GenerationContext) -> CanonicalResult {
    let input = ctx.input.trim();
    let polished = if ctx.is_zh {
        let text = if input.is_empty() { "请输入需要润色的内容" } else { input };
        format!("润色建议：{}（已统一术语、优化逻辑衔接、提升学术表达）", text)
    } else {
        let text = if input.is_empty() {
            "Provide the paragraph to polish."
        } else {
            input
        };
        format!(
            "Polished draft: {} (terminology aligned, flow improved, academic tone enhanced)",
            text
        )
    };
    CanonicalResult::Polish { polished }
}

fn search(ctx: &GenerationContext) -> CanonicalResult {
    let (focus, field) = (&ctx.focus, &ctx.field);
    let results = if ctx.is_zh {
        vec![
            SearchRecord::new(format!("{}的最新研究综述", focus), 2023, "Journal of Research Insights"),
            SearchRecord::new(format!("{}中的{}模型构建", field, focus), 2022, "International Review"),
            SearchRecord::new(format!("{}的实证检验", focus), 2021, "Academic Reports"),
        ]
    } else {
        vec![
            SearchRecord::new(format!("Recent Advances on {}", focus), 2023, "Journal of Research Insights"),
            SearchRecord::new(format!("{} Modeling in {}", focus, field), 2022, "International Review"),
            SearchRecord::new(format!("Empirical Evidence of {}", focus), 2021, "Academic Reports"),
        ]
    };
    CanonicalResult::Search { results }
}

fn citations(ctx: &GenerationContext) -> CanonicalResult {
    let first = ctx
        .reference_names
        .first()
        .map(String::as_str)
        .unwrap_or(PLACEHOLDER_CITATIONS[0]);
    let second = ctx
        .reference_names
        .get(1)
        .map(String::as_str)
        .unwrap_or(PLACEHOLDER_CITATIONS[1]);
    let citation_block = if ctx.is_zh {
        format!("建议引用：{}；{}", first, second)
    } else {
        format!("Suggested citations: {}; {}", first, second)
    };
    CanonicalResult::Citations { citation_block }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationRequest, ProjectProfile, ReferenceItem, WritingLanguage};

    fn context(request: &GenerationRequest) -> GenerationContext {
        GenerationContext::build(request)
    }

    #[test]
    fn test_every_module_well_formed() {
        let requests = [
            GenerationRequest::default(),
            GenerationRequest::new("个性化学习"),
            GenerationRequest::new("adaptive learning").project(ProjectProfile {
                language: Some(WritingLanguage::Mixed),
                ..Default::default()
            }),
        ];
        for request in &requests {
            let ctx = context(request);
            for module in Module::ALL {
                let result = generate(module, &ctx);
                assert_eq!(result.module(), module);
                assert!(result.is_well_formed(), "{:?}", result);
            }
        }
    }

    #[test]
    fn test_topic_interpolates_focus_and_field() {
        let request = GenerationRequest::default().project(ProjectProfile {
            field: "教育技术".to_string(),
            method: "案例分析".to_string(),
            keywords: "个性化学习,评价体系".to_string(),
            ..Default::default()
        });
        match generate(Module::Topic, &context(&request)) {
            CanonicalResult::Topic { titles } => {
                assert_eq!(titles.len(), 5);
                for title in &titles {
                    assert!(title.contains("个性化学习 / 评价体系"), "{}", title);
                    assert!(title.contains("教育技术"), "{}", title);
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_polish_echoes_input() {
        let ctx = context(&GenerationRequest::new("  My paragraph.  "));
        assert_eq!(
            generate(Module::Polish, &ctx),
            CanonicalResult::Polish {
                polished: "Polished draft: My paragraph. (terminology aligned, flow improved, academic tone enhanced)".to_string()
            }
        );
    }

    #[test]
    fn test_citations_use_reference_names() {
        let request = GenerationRequest::default().references(vec![
            ReferenceItem::new("Wang 2021.pdf", None),
            ReferenceItem::new("Chen 2020.pdf", None),
            ReferenceItem::new("Zhou 2019.pdf", None),
        ]);
        assert_eq!(
            generate(Module::Citations, &context(&request)),
            CanonicalResult::Citations {
                citation_block: "Suggested citations: Wang 2021.pdf; Chen 2020.pdf".to_string()
            }
        );

        let only_one = GenerationRequest::new("中文")
            .references(vec![ReferenceItem::new("Wang 2021.pdf", None)]);
        assert_eq!(
            generate(Module::Citations, &context(&only_one)),
            CanonicalResult::Citations {
                citation_block: "建议引用：Wang 2021.pdf；Li & Zhao (2022)".to_string()
            }
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        let ctx = context(&GenerationRequest::new("adaptive learning"));
        for module in Module::ALL {
            assert_eq!(generate(module, &ctx), generate(module, &ctx));
        }
    }
}
