use settleflow_mssql::{SqlVirtualMachineId, SqlVirtualMachineResource};

pub async fn handle(id: &str) -> anyhow::Result<()> {
    let id: SqlVirtualMachineId = id.parse()?;
    let (_, client) = super::connect()?;

    let state = SqlVirtualMachineResource::new(&client)
        .read_id(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("SQL virtual machine {} does not exist", id))?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
