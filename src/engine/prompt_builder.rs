use crate::engine::llm_client::ChatMessage;
use crate::model::scenario::ScenarioParams;

/// First-person narrator instruction shared by both story calls.
pub const NARRATOR_SYSTEM_PROMPT: &str = "你是一个创业模拟器，用第一人称视角(\"你\")讲述创业故事。要求：
1. 用\"你\"作为第一人称主角
2. 每次生成200-300字的内容
3. 内容要具体生动，富有代入感
4. 结尾给出一个需要玩家决策的场景";

pub const CHOICE_ADVISOR_SYSTEM_PROMPT: &str =
    "你是一个创业顾问，负责为创业者提供选择建议。每个选择都应该具体且有趣，能推动故事发展。";

pub const TYPE_ADVISOR_SYSTEM_PROMPT: &str = "你是一个创业顾问，负责推荐有趣且现实的创业方向。";

/// Builds the message lists sent to the backend.
/// Only formats text: no parsing, no networking.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn initial_story(params: &ScenarioParams) -> Vec<ChatMessage> {
        let mut prompt = String::new();

        prompt.push_str("生成一个创业开局故事：\n\n");
        push_scenario_fields(&mut prompt, params);
        push_requirements(
            &mut prompt,
            &[
                "以\"你\"为主角描述创业初期场景",
                "介绍公司成立背景和现状",
                "描述团队优势",
                "提出一个需要决策的关键场景",
                "用Markdown格式输出，标题用一级标题",
            ],
        );

        vec![
            ChatMessage::system(NARRATOR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }

    pub fn next_event(story: &str, choice: &str, context: &str) -> Vec<ChatMessage> {
        let mut prompt = String::new();

        prompt.push_str("基于玩家的选择，继续创业故事：\n\n");
        push_context(&mut prompt, context);
        push_story(&mut prompt, story);
        prompt.push_str(&format!("玩家选择：{choice}\n\n"));

        let opening = format!("以\"你选择了{choice}\"开头");
        push_requirements(
            &mut prompt,
            &[
                opening.as_str(),
                "详细描述选择带来的具体结果",
                "提出新的决策场景",
                "用Markdown格式输出，用一级标题",
            ],
        );

        vec![
            ChatMessage::system(NARRATOR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }

    pub fn choices(story: &str, context: &str) -> Vec<ChatMessage> {
        let mut prompt = String::new();

        prompt.push_str("基于以下背景和故事，生成3-4个可能的选择。每个选择应该：\n");
        push_numbered(
            &mut prompt,
            &["不超过20个字", "具体可执行", "有趣且符合逻辑", "能带来不同的结果"],
        );
        prompt.push('\n');
        push_context(&mut prompt, context);
        push_story(&mut prompt, story);
        prompt.push_str("请返回一个JSON对象，格式为：{\"choices\": [\"选项1\", \"选项2\", \"选项3\"]}");

        vec![
            ChatMessage::system(CHOICE_ADVISOR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }

    pub fn startup_types(count: usize) -> Vec<ChatMessage> {
        let mut prompt = format!("请推荐{count}个有趣的创业方向，要求：\n");
        push_numbered(
            &mut prompt,
            &[
                "每个选项不超过10个字",
                "要具体可执行",
                "符合当前创业趋势",
                "返回JSON格式，格式为：{\"types\": [\"方向1\", \"方向2\"]}",
            ],
        );

        vec![
            ChatMessage::system(TYPE_ADVISOR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }
}

/// The background block quoted into choice and continuation prompts.
pub fn scenario_context(params: &ScenarioParams) -> String {
    format!(
        "公司：{}\n类型：{}\n地点：{}\n团队：{}",
        params.company_name, params.startup_type, params.location, params.team_info
    )
}

fn push_scenario_fields(prompt: &mut String, params: &ScenarioParams) {
    prompt.push_str(&format!("公司名称：{}\n", params.company_name));
    prompt.push_str(&format!("创业类型：{}\n", params.startup_type));
    prompt.push_str(&format!("创业地点：{}\n", params.location));
    prompt.push_str(&format!("团队信息：{}\n\n", params.team_info));
}

fn push_context(prompt: &mut String, context: &str) {
    prompt.push_str("背景信息：\n");
    prompt.push_str(context);
    prompt.push_str("\n\n");
}

fn push_story(prompt: &mut String, story: &str) {
    prompt.push_str("当前故事：\n");
    prompt.push_str(story);
    prompt.push_str("\n\n");
}

fn push_requirements(prompt: &mut String, items: &[&str]) {
    prompt.push_str("要求：\n");
    push_numbered(prompt, items);
}

fn push_numbered(prompt: &mut String, items: &[&str]) {
    for (i, item) in items.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, item));
    }
}
