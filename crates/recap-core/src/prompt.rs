/// The fixed instructional prompt wrapped around an assembled transcript.
pub fn build(channel_name: &str, date: &str, transcript: &str) -> String {
    format!(
        "Please analyze the following standup messages from {channel_name} on {date} \
and provide a comprehensive summary.

Focus on:
1. Key updates and progress made by team members
2. Blockers or challenges mentioned
3. Plans for upcoming work
4. Important decisions or discussions
5. Overall team sentiment and productivity

Format your response as a clear, organized summary that a manager could \
quickly read to understand the team's status.

Messages:
{transcript}"
    )
}
