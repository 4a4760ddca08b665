use carecompass_types::Profile;

/// Free-text patient summary sent along with every chat request
///
/// Field order is fixed and each part ends with a single space. Only the
/// name is unconditional.
pub fn patient_context(profile: Option<&Profile>) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    let mut ctx = format!("Patient Name: {}. ", profile.name);

    push_part(&mut ctx, "DOB", &profile.dob);
    push_part(&mut ctx, "Insurance", &profile.insurance.provider);
    push_part(&mut ctx, "Conditions", &profile.conditions.join(", "));
    push_part(&mut ctx, "Age", &profile.age);

    if !profile.medications_list.is_empty() {
        let meds = profile
            .medications_list
            .iter()
            .map(|m| format!("{} {}", m.name, m.dosage))
            .collect::<Vec<_>>()
            .join(", ");
        push_part(&mut ctx, "Meds", &meds);
    } else {
        push_part(&mut ctx, "Meds", &profile.medications);
    }

    push_part(&mut ctx, "BP", &profile.vitals.blood_pressure);
    push_part(&mut ctx, "HR", &profile.vitals.heart_rate);
    push_part(&mut ctx, "Other Vitals", &profile.vitals.other_vitals);

    ctx
}

fn push_part(ctx: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        ctx.push_str(&format!("{}: {}. ", label, value));
    }
}
