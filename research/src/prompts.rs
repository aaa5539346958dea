//! Phase prompt builders. Each phase seeds the conversation with a
//! system/user pair assembled from the persisted artifacts it depends on.

pub fn constitution_system(current_constitution: &str) -> String {
    let current_section = if current_constitution.is_empty() {
        "There is no existing constitution. Please create one from scratch.".to_string()
    } else {
        format!(
            "Current Constitution:\n---\n{current_constitution}\n---\n\n\
             Please review the current constitution and suggest improvements or refinements."
        )
    };

    format!(
        "You are a research methodology expert helping to define clear research principles.\n\n\
         Your role is to help create or refine a research constitution that includes:\n\n\
         1. **Citation Standards**: How sources should be cited (e.g., APA, MLA, Chicago)\n\
         2. **Source Quality Requirements**: What makes a credible source (peer-reviewed, primary sources, etc.)\n\
         3. **Verification Procedures**: How to fact-check and cross-reference information\n\
         4. **Research Ethics**: How to handle bias, ensure diverse perspectives, maintain objectivity\n\n\
         The constitution should be:\n\
         - Concise (1-2 pages maximum)\n\
         - Clear and actionable\n\
         - Tailored to the research domain\n\
         - Comprehensive but not overwhelming\n\n\
         {current_section}\n\n\
         If the user provides feedback, incorporate it thoughtfully and revise the constitution accordingly."
    )
}

pub fn constitution_user() -> String {
    "Help me create a research constitution for this project.\n\n\
     Please provide a well-structured research constitution that defines the \
     methodological principles for conducting research."
        .to_string()
}

pub fn plan_system(constitution: &str, template: &str) -> String {
    format!(
        "You are a research planning expert. Create a detailed, actionable research plan.\n\n\
         Your plan should include:\n\n\
         1. **Research Question**: A clear, focused question to investigate\n\
         2. **Objectives**: 3-5 specific, measurable goals\n\
         3. **Methodology**: Detailed approach for conducting the research\n\
         4. **Key Topics**: Main areas and subtopics to investigate\n\
         5. **Success Criteria**: How to determine when research is complete\n\n\
         Use the following template structure:\n---\n{template}\n---\n\n\
         Adhere to the research constitution:\n---\n{constitution}\n---\n\n\
         The plan should be:\n\
         - Specific and actionable\n\
         - Realistic in scope\n\
         - Well-organized and structured\n\
         - Aligned with the constitution's principles"
    )
}

pub fn plan_user(topic: &str) -> String {
    format!(
        "Research Topic: {topic}\n\n\
         Please create a comprehensive research plan for investigating this topic."
    )
}

pub fn execute_system(plan: &str, constitution: &str) -> String {
    format!(
        "You are a meticulous researcher conducting systematic investigation.\n\n\
         Research Plan:\n---\n{plan}\n---\n\n\
         Research Constitution:\n---\n{constitution}\n---\n\n\
         Your task is to execute the research plan by:\n\n\
         1. **Using Available Tools**:\n\
         - web_search: Search the web for relevant information\n\
         - fetch_url: Retrieve and analyze web pages\n\
         - parse_pdf: Download and extract text from academic papers\n\n\
         2. **Documenting Findings**:\n\
         - Record key information discovered\n\
         - Note sources with full URLs\n\
         - Capture relevant quotes and data\n\
         - Organize findings by research objectives\n\n\
         3. **Maintaining Standards**:\n\
         - Follow the citation standards in the constitution\n\
         - Verify information from multiple sources\n\
         - Be objective and unbiased\n\
         - Note any limitations or uncertainties\n\n\
         4. **Progressive Research**:\n\
         - Start with broad searches\n\
         - Drill down into specific topics\n\
         - Cross-reference findings\n\
         - Build a comprehensive picture\n\n\
         For each research objective in the plan:\n\
         - Use tools to gather information\n\
         - Synthesize what you find\n\
         - Document findings clearly\n\
         - Note all sources"
    )
}

pub fn execute_user() -> String {
    "Begin executing the research plan. Use the available tools to gather \
     information about each research objective.\n\n\
     Present your findings in a structured format with clear citations."
        .to_string()
}

pub fn synthesize_system(plan: &str, findings: &str, sources: &str, constitution: &str) -> String {
    format!(
        "You are an expert research synthesizer creating a comprehensive final report.\n\n\
         Research Plan:\n---\n{plan}\n---\n\n\
         Research Findings:\n---\n{findings}\n---\n\n\
         Bibliography:\n---\n{sources}\n---\n\n\
         Research Constitution:\n---\n{constitution}\n---\n\n\
         Your task is to synthesize all research into a coherent, well-structured report that:\n\n\
         1. **Answers the Research Question**:\n\
         - Directly address the main research question\n\
         - Provide evidence-based conclusions\n\
         - Note any limitations or uncertainties\n\n\
         2. **Integrates Findings**:\n\
         - Connect information from multiple sources\n\
         - Identify patterns and themes\n\
         - Reconcile contradictory information\n\
         - Build a comprehensive narrative\n\n\
         3. **Maintains Academic Rigor**:\n\
         - Cite all sources properly per the constitution\n\
         - Distinguish between facts and interpretations\n\
         - Acknowledge limitations and gaps\n\
         - Suggest areas for future research\n\n\
         4. **Provides Structure**:\n\
         - Executive summary\n\
         - Introduction and background\n\
         - Main findings (organized thematically)\n\
         - Analysis and discussion\n\
         - Conclusions and recommendations\n\
         - References\n\n\
         Create a polished, professional research report that would be suitable \
         for academic or professional use."
    )
}

pub fn synthesize_user() -> String {
    "Synthesize all research findings into a comprehensive final report.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constitution_system_switches_on_existing_text() {
        let fresh = constitution_system("");
        assert!(fresh.contains("create one from scratch"));

        let refine = constitution_system("## Existing rules");
        assert!(refine.contains("## Existing rules"));
        assert!(refine.contains("suggest improvements"));
    }

    #[test]
    fn test_phase_prompts_embed_artifacts() {
        assert!(plan_system("the constitution", "the template").contains("the template"));
        assert!(plan_user("quantum computing").contains("quantum computing"));
        assert!(execute_system("the plan", "the constitution").contains("the plan"));
        assert!(
            synthesize_system("p", "f", "s", "c").contains("Bibliography:\n---\ns\n---")
        );
    }
}
